use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tokio::fs;
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::models::version::{is_safe_url_path, RejectedVersion, VersionRegistry, VersionSpec};

/// 注册表文件中的原始条目，字段缺失时留空再逐条校验
#[derive(Debug, Deserialize)]
struct RawVersion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    branch: String,
    #[serde(default)]
    url_path: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    #[serde(default)]
    versions: Vec<RawVersion>,
    #[serde(default)]
    default_version: String,
    #[serde(default)]
    latest_version: String,
}

/// 加载版本注册表
///
/// 读取或解析失败时记录错误并返回空注册表，不会中断整个程序。
pub async fn load_version_registry(versions_file: &Path) -> VersionRegistry {
    match try_load_version_registry(versions_file).await {
        Ok(registry) => {
            let names: Vec<&str> = registry.versions.iter().map(|v| v.name.as_str()).collect();
            info!("✓ 加载版本配置: {:?}", names);
            registry
        }
        Err(e) => {
            error!("✗ 无法加载版本配置: {}", e);
            VersionRegistry::empty()
        }
    }
}

pub async fn try_load_version_registry(
    versions_file: &Path,
) -> Result<VersionRegistry, ConfigError> {
    let content =
        fs::read_to_string(versions_file)
            .await
            .map_err(|source| ConfigError::ReadFailed {
                path: versions_file.to_path_buf(),
                source,
            })?;
    parse_version_registry(&content, versions_file)
}

/// 解析注册表内容并校验每个条目
pub fn parse_version_registry(
    content: &str,
    versions_file: &Path,
) -> Result<VersionRegistry, ConfigError> {
    let json_err = |source| ConfigError::JsonParseFailed {
        path: versions_file.to_path_buf(),
        source,
    };
    let raw_value: serde_json::Value = serde_json::from_str(content).map_err(json_err)?;
    let raw: RawRegistry = serde_json::from_value(raw_value.clone()).map_err(json_err)?;

    let mut registry = VersionRegistry {
        default_version: raw.default_version,
        latest_version: raw.latest_version,
        raw: raw_value,
        ..Default::default()
    };

    let mut seen_names = HashSet::new();
    let mut seen_paths = HashSet::new();

    for (index, entry) in raw.versions.into_iter().enumerate() {
        let reason = if entry.name.trim().is_empty() {
            Some("name 为空".to_string())
        } else if entry.branch.trim().is_empty() {
            Some("branch 为空".to_string())
        } else if !is_safe_url_path(&entry.url_path) {
            Some(format!("url_path '{}' 不是安全的目录名", entry.url_path))
        } else if seen_names.contains(&entry.name) {
            Some(format!("name '{}' 重复", entry.name))
        } else if seen_paths.contains(&entry.url_path) {
            Some(format!("url_path '{}' 与其他版本重复", entry.url_path))
        } else {
            None
        };

        if let Some(reason) = reason {
            let err = ConfigError::InvalidVersion {
                index,
                name: entry.name.clone(),
                reason: reason.clone(),
            };
            error!("✗ {}", err);
            registry.rejected.push(RejectedVersion {
                index,
                name: entry.name,
                reason,
            });
            continue;
        }

        seen_names.insert(entry.name.clone());
        seen_paths.insert(entry.url_path.clone());
        let display_name = if entry.display_name.is_empty() {
            entry.name.clone()
        } else {
            entry.display_name
        };
        registry.versions.push(VersionSpec {
            name: entry.name,
            display_name,
            branch: entry.branch,
            url_path: entry.url_path,
            description: entry.description,
        });
    }

    if !registry.default_version.is_empty() && registry.default_version().is_none() {
        warn!(
            "⚠️ 默认版本 '{}' 不在版本列表中，重定向将使用 'latest'",
            registry.default_version
        );
    }
    if !registry.latest_version.is_empty() && registry.latest_version().is_none() {
        warn!("⚠️ 最新版本 '{}' 不在版本列表中", registry.latest_version);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(content: &str) -> VersionRegistry {
        parse_version_registry(content, &PathBuf::from("versions.json")).unwrap()
    }

    #[test]
    fn test_parse_valid_registry() {
        let registry = parse(
            r#"{
                "versions": [
                    {"name": "v1", "display_name": "V1", "branch": "v1", "url_path": "v1"},
                    {"name": "v2", "display_name": "V2", "branch": "main", "url_path": "latest", "description": "dev"}
                ],
                "default_version": "v1",
                "latest_version": "v2"
            }"#,
        );
        assert_eq!(registry.versions.len(), 2);
        assert!(registry.rejected.is_empty());
        assert_eq!(registry.default_url_path(), "v1");
        assert_eq!(registry.latest_version().unwrap().branch, "main");
        assert_eq!(registry.versions[1].description, "dev");
    }

    #[test]
    fn test_duplicates_and_unsafe_paths_are_rejected() {
        let registry = parse(
            r#"{
                "versions": [
                    {"name": "v1", "branch": "v1", "url_path": "v1"},
                    {"name": "v1", "branch": "other", "url_path": "other"},
                    {"name": "v2", "branch": "v2", "url_path": "v1"},
                    {"name": "v3", "branch": "v3", "url_path": "../escape"},
                    {"name": "v4", "url_path": "v4"}
                ]
            }"#,
        );
        assert_eq!(registry.versions.len(), 1);
        assert_eq!(registry.rejected.len(), 4);
        assert_eq!(registry.configured_count(), 5);
        assert_eq!(registry.versions[0].display_name, "v1");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let result = parse_version_registry("{ not json", &PathBuf::from("versions.json"));
        assert!(matches!(result, Err(ConfigError::JsonParseFailed { .. })));
    }

    #[tokio::test]
    async fn test_missing_file_degrades_to_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = load_version_registry(&dir.path().join("missing.json")).await;
        assert!(registry.is_empty());
        assert_eq!(registry.configured_count(), 0);
        assert_eq!(registry.default_url_path(), "latest");
    }
}
