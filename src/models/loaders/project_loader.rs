use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::models::project::ProjectConfig;

/// 项目配置文件名
pub const PROJECT_CONFIG_FILE: &str = "config.yaml";

/// 读取文档源目录下的 config.yaml
///
/// 文件缺失或格式错误时使用默认值。
pub async fn load_project_config(docs_source: &Path) -> ProjectConfig {
    let path = docs_source.join(PROJECT_CONFIG_FILE);
    if !path.is_file() {
        debug!("未找到项目配置 {}，使用默认值", path.display());
        return ProjectConfig::default();
    }
    match try_load_project_config(&path).await {
        Ok(config) => config,
        Err(e) => {
            warn!("⚠️ {}，使用默认值", e);
            ProjectConfig::default()
        }
    }
}

/// 优先读取工作树自己的配置，不存在时回退到主工作树
pub async fn load_project_config_with_fallback(
    docs_source: &Path,
    ambient_docs_source: &Path,
) -> ProjectConfig {
    if docs_source.join(PROJECT_CONFIG_FILE).is_file() {
        load_project_config(docs_source).await
    } else {
        load_project_config(ambient_docs_source).await
    }
}

pub async fn try_load_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    if content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParseFailed {
        path: path.to_path_buf(),
        source,
    })
}
