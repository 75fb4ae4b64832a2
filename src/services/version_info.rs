//! 版本元数据文件
//!
//! 每个版本目录下写入 `version_config.json`、`version_info.html`，
//! `_static/` 下写入 `version_config.json` 与 `version_info.js`，供前端版本切换使用。

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::{ProjectConfig, VersionRegistry, VersionSpec};

/// 当前版本信息（`window.versionInfo`）
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub branch: &'a str,
    pub url_path: &'a str,
    pub description: &'a str,
    #[serde(rename = "projectsDir")]
    pub projects_dir: String,
    #[serde(rename = "copyFiles")]
    pub copy_files: &'a [serde_json::Value],
}

impl<'a> VersionInfo<'a> {
    pub fn new(spec: &'a VersionSpec, project: &'a ProjectConfig) -> Self {
        Self {
            name: &spec.name,
            display_name: &spec.display_name,
            branch: &spec.branch,
            url_path: &spec.url_path,
            description: &spec.description,
            projects_dir: project.projects_dir_web(),
            copy_files: &project.generation.copy_files,
        }
    }
}

/// 写入版本元数据文件
pub async fn write_version_metadata(
    output_dir: &Path,
    registry: &VersionRegistry,
    spec: &VersionSpec,
    project: &ProjectConfig,
) -> Result<()> {
    let static_dir = output_dir.join("_static");
    tokio::fs::create_dir_all(&static_dir).await?;

    let registry_json = serde_json::to_string_pretty(&registry.raw)?;
    for path in [
        output_dir.join("version_config.json"),
        static_dir.join("version_config.json"),
    ] {
        write(&path, &registry_json).await?;
    }

    let info_json = serde_json::to_string(&VersionInfo::new(spec, project))?;
    write(&output_dir.join("version_info.html"), &version_info_page(&info_json)).await?;
    write(
        &static_dir.join("version_info.js"),
        &format!("window.versionInfo = {};\n", info_json),
    )
    .await?;

    info!("[版本 {}] ✓ 生成版本配置文件", spec.name);
    Ok(())
}

async fn write(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("无法写入 {}", path.display()))
}

/// 内联到 `<script>` 中的 JSON 不能包含 `</`，否则会提前结束脚本块
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn version_info_page(info_json: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>版本信息</title>
</head>
<body>
    <script>
        window.versionInfo = {};
    </script>
</body>
</html>
"#,
        script_safe(info_json)
    )
}
