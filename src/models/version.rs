//! 版本定义与版本注册表

use serde::{Deserialize, Serialize};

/// 重定向目标在默认版本无法解析时使用的固定路径
pub const FALLBACK_URL_PATH: &str = "latest";

/// 单个版本定义（加载后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    /// 唯一键
    pub name: String,
    /// 显示名称
    pub display_name: String,
    /// 源码分支
    pub branch: String,
    /// 输出目录名（文件系统与 URL 安全）
    pub url_path: String,
    /// 描述
    #[serde(default)]
    pub description: String,
}

/// 被拒绝的版本条目
///
/// 这些版本已配置但无法构建，汇总时计为失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedVersion {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// 版本注册表
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    pub versions: Vec<VersionSpec>,
    pub rejected: Vec<RejectedVersion>,
    pub default_version: String,
    pub latest_version: String,
    /// 原始注册表文档，原样发布为 version_config.json
    pub raw: serde_json::Value,
}

impl VersionRegistry {
    /// 空注册表（加载失败时的降级结果）
    pub fn empty() -> Self {
        Self {
            raw: serde_json::json!({
                "versions": [],
                "default_version": "",
                "latest_version": "",
            }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// 配置的版本总数（包括被拒绝的条目）
    pub fn configured_count(&self) -> usize {
        self.versions.len() + self.rejected.len()
    }

    pub fn find(&self, name: &str) -> Option<&VersionSpec> {
        self.versions.iter().find(|v| v.name == name)
    }

    pub fn default_version(&self) -> Option<&VersionSpec> {
        self.find(&self.default_version)
    }

    pub fn latest_version(&self) -> Option<&VersionSpec> {
        self.find(&self.latest_version)
    }

    /// 默认版本的输出目录，无法解析时回退为 `latest`
    pub fn default_url_path(&self) -> &str {
        self.default_version()
            .map(|v| v.url_path.as_str())
            .unwrap_or(FALLBACK_URL_PATH)
    }
}

/// url_path 只允许 ASCII 字母数字、`.`、`-`、`_`
pub fn is_safe_url_path(url_path: &str) -> bool {
    !url_path.is_empty()
        && url_path != "."
        && url_path != ".."
        && url_path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, url_path: &str) -> VersionSpec {
        VersionSpec {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            branch: name.to_string(),
            url_path: url_path.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_default_url_path_falls_back_to_latest() {
        let mut registry = VersionRegistry::empty();
        registry.versions = vec![spec("v1", "v1"), spec("v2", "stable")];
        registry.default_version = "v2".to_string();
        assert_eq!(registry.default_url_path(), "stable");

        registry.default_version = "missing".to_string();
        assert_eq!(registry.default_url_path(), "latest");
        assert!(registry.latest_version().is_none());
    }

    #[test]
    fn test_is_safe_url_path() {
        assert!(is_safe_url_path("v1.2-rc_1"));
        assert!(!is_safe_url_path(""));
        assert!(!is_safe_url_path(".."));
        assert!(!is_safe_url_path("a/b"));
        assert!(!is_safe_url_path("a b"));
        assert!(!is_safe_url_path("版本"));
    }
}
