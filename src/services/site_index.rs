//! 站点入口页面
//!
//! 在站点根目录和版本根目录写入跳转到默认版本的页面。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::VersionRegistry;

pub struct SiteIndexComposer {
    site_root: PathBuf,
    versions_root: PathBuf,
}

impl SiteIndexComposer {
    pub fn new(site_root: impl Into<PathBuf>, versions_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            versions_root: versions_root.into(),
        }
    }

    /// 写入两个跳转页面，返回写入的文件路径
    pub async fn compose(&self, registry: &VersionRegistry) -> Result<Vec<PathBuf>> {
        let default_url = registry.default_url_path();

        let root_index = self.site_root.join("index.html");
        let root_target = format!("./versions/{}/index.html", default_url);
        write_page(&root_index, &redirect_page("SDK 文档", &root_target)).await?;
        info!("✓ 创建统一入口页面: {}", root_index.display());

        let versions_index = self.versions_root.join("index.html");
        let versions_target = format!("./{}/index.html", default_url);
        write_page(
            &versions_index,
            &redirect_page("SDK 文档 - 版本列表", &versions_target),
        )
        .await?;
        info!("✓ 创建版本根页面: {}", versions_index.display());

        Ok(vec![root_index, versions_index])
    }
}

async fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, html)
        .await
        .with_context(|| format!("无法写入 {}", path.display()))
}

/// 带自动跳转和手动链接的页面
pub fn redirect_page(title: &str, target: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <meta http-equiv="refresh" content="0; url={target}">
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
        }}
        .container {{
            text-align: center;
            background: rgba(255, 255, 255, 0.1);
            padding: 40px;
            border-radius: 12px;
        }}
        a {{
            color: white;
            text-decoration: underline;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <p>正在跳转到文档首页...</p>
        <p><a href="{target}">如果页面没有自动跳转，请点击这里</a></p>
    </div>
</body>
</html>
"#
    )
}
