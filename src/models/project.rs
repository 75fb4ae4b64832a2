//! 项目/构建配置（docs/source/config.yaml）

use serde::{Deserialize, Serialize};

/// 未配置项目名称时使用的默认名称
pub const DEFAULT_PROJECT_NAME: &str = "SDK_Docs";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub repository: RepositorySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            title: String::new(),
            version: String::new(),
        }
    }
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSection {
    /// 分类目录，按顺序
    #[serde(default)]
    pub output_structure: Vec<String>,
    #[serde(default)]
    pub copy_files: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySection {
    #[serde(default)]
    pub projects_dir: String,
}

impl ProjectConfig {
    pub fn project_name(&self) -> &str {
        let name = self.project.name.trim();
        if name.is_empty() {
            DEFAULT_PROJECT_NAME
        } else {
            name
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.generation.output_structure
    }

    /// 项目源目录的 URL 片段：取 projects_dir 中最后一个有效路径段
    ///
    /// `../../project` → `project`
    pub fn projects_dir_web(&self) -> String {
        self.repository
            .projects_dir
            .replace('\\', "/")
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
            .last()
            .unwrap_or_default()
            .to_string()
    }

    /// 由项目名称生成安全的文件名
    pub fn slug(&self) -> String {
        slugify(self.project_name())
    }
}

/// 保留字母数字（包括中文），空格转为下划线，保留 `-` 与 `_`
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter_map(|ch| match ch {
            ' ' => Some('_'),
            '-' | '_' => Some(ch),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Titan Board SDK"), "Titan_Board_SDK");
        assert_eq!(slugify("瑞萨 RA8 文档!"), "瑞萨_RA8_文档");
        assert_eq!(slugify(" ?? "), "SDK_Docs");
    }

    #[test]
    fn test_projects_dir_web() {
        let mut config = ProjectConfig::default();
        config.repository.projects_dir = "../../project".to_string();
        assert_eq!(config.projects_dir_web(), "project");
        config.repository.projects_dir = r"..\..\projects\examples".to_string();
        assert_eq!(config.projects_dir_web(), "examples");
        config.repository.projects_dir = String::new();
        assert_eq!(config.projects_dir_web(), "");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ProjectConfig =
            serde_yaml::from_str("generation:\n  output_structure: [basic, driver]\n").unwrap();
        assert_eq!(config.project_name(), "SDK_Docs");
        assert_eq!(config.categories(), ["basic", "driver"]);
    }
}
