use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// 版本注册表相对于项目根目录的位置
pub const VERSIONS_FILE_REL: &str = ".github/versions.json";

/// 构建目录位于文档源目录之内时，隔离工作树放在项目根目录下的这个目录
pub const WORKTREES_DIR_NAME: &str = ".docs_worktrees";

/// 程序配置
///
/// 启动时一次性从环境变量加载，之后只读。
#[derive(Clone, Debug)]
pub struct Config {
    /// 项目根目录（主工作树）
    pub project_root: PathBuf,
    /// 版本注册表文件
    pub versions_file: PathBuf,
    /// 文档源目录（相对于工作树根目录）
    pub docs_source_dir: PathBuf,
    /// 构建输出根目录
    pub build_root: PathBuf,
    /// Python 解释器（驱动文档生成器与编译器）
    pub python: String,
    /// 单个外部命令的超时时间（秒）
    pub command_timeout_secs: u64,
    /// 同时构建的版本数量
    pub max_concurrent_versions: usize,
    /// 获取缺失分支时使用的远程
    pub default_remote: String,
    /// 输出日志文件
    pub output_log_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::for_root(find_project_root(&cwd).unwrap_or(cwd))
    }
}

impl Config {
    /// 以给定项目根目录创建默认配置
    pub fn for_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let docs_source_dir = PathBuf::from("docs/source");
        let build_root = project_root.join(&docs_source_dir).join("source_build");
        Self {
            versions_file: project_root.join(VERSIONS_FILE_REL),
            output_log_file: build_root.join("build.log"),
            docs_source_dir,
            build_root,
            python: "python3".to_string(),
            command_timeout_secs: 1800,
            max_concurrent_versions: 1,
            default_remote: "origin".to_string(),
            verbose_logging: false,
            project_root,
        }
    }

    pub fn from_env() -> Self {
        let mut config = match std::env::var("DOCS_PROJECT_ROOT") {
            Ok(root) if !root.is_empty() => Self::for_root(root),
            _ => Self::default(),
        };

        config.apply_path_overrides(|name| std::env::var(name).ok());
        config.python = std::env::var("DOCS_PYTHON").unwrap_or(config.python);
        config.default_remote = std::env::var("DOCS_GIT_REMOTE").unwrap_or(config.default_remote);
        config.command_timeout_secs =
            env_parse("DOCS_COMMAND_TIMEOUT_SECS", "u64").unwrap_or(config.command_timeout_secs);
        config.max_concurrent_versions = env_parse("DOCS_MAX_CONCURRENT_VERSIONS", "usize")
            .unwrap_or(config.max_concurrent_versions);
        config.verbose_logging =
            env_parse("DOCS_VERBOSE", "bool").unwrap_or(config.verbose_logging);

        config.validated()
    }

    /// 应用路径类覆盖项（`DOCS_SOURCE_DIR`、`DOCS_VERSIONS_FILE`、`DOCS_BUILD_ROOT`、`DOCS_BUILD_LOG`）
    ///
    /// 依赖项目根目录，更换根目录后需要重新应用。
    pub fn apply_path_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("DOCS_SOURCE_DIR") {
            self.set_docs_source_dir(dir);
        }
        if let Some(file) = var("DOCS_VERSIONS_FILE") {
            self.versions_file = PathBuf::from(file);
        }
        if let Some(root) = var("DOCS_BUILD_ROOT") {
            self.set_build_root(root);
        }
        if let Some(log) = var("DOCS_BUILD_LOG") {
            self.output_log_file = PathBuf::from(log);
        }
    }

    /// 校验数值配置，不合法的值回退为默认值
    pub fn validated(mut self) -> Self {
        if self.max_concurrent_versions == 0 {
            warn!("⚠️ max_concurrent_versions 不能为 0，使用 1");
            self.max_concurrent_versions = 1;
        }
        if self.command_timeout_secs == 0 {
            warn!("⚠️ command_timeout_secs 不能为 0，使用 1800");
            self.command_timeout_secs = 1800;
        }
        self
    }

    /// 修改文档源目录，同时更新依赖它的默认构建目录
    pub fn set_docs_source_dir(&mut self, dir: impl Into<PathBuf>) {
        self.docs_source_dir = dir.into();
        self.set_build_root(self.ambient_docs_source().join("source_build"));
    }

    pub fn set_build_root(&mut self, root: impl Into<PathBuf>) {
        self.build_root = root.into();
        self.output_log_file = self.build_root.join("build.log");
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// 主工作树中的文档源目录
    pub fn ambient_docs_source(&self) -> PathBuf {
        self.project_root.join(&self.docs_source_dir)
    }

    /// 隔离工作树根目录
    ///
    /// 不能位于主工作树的文档源目录之内，否则主工作树的编译会扫描到其他分支的源文件。
    pub fn worktrees_dir(&self) -> PathBuf {
        if self.build_root.starts_with(self.ambient_docs_source()) {
            self.project_root.join(WORKTREES_DIR_NAME)
        } else {
            self.build_root.join("worktrees")
        }
    }

    pub fn variants_dir(&self) -> PathBuf {
        self.build_root.join("variants")
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.build_root.join("quarantine")
    }

    /// 站点根目录（放置统一入口页面）
    pub fn site_root(&self) -> PathBuf {
        self.build_root.join("html")
    }

    /// 所有版本输出的根目录
    pub fn versions_root(&self) -> PathBuf {
        self.site_root().join("versions")
    }

    pub fn version_output_dir(&self, url_path: &str) -> PathBuf {
        self.versions_root().join(url_path)
    }

    pub fn summary_file(&self) -> PathBuf {
        self.build_root.join("build_summary.json")
    }
}

/// 向上查找包含版本注册表的目录
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(VERSIONS_FILE_REL).is_file())
        .map(Path::to_path_buf)
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            };
            warn!("⚠️ {}，使用默认值", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_derived_from_build_root() {
        let config = Config::for_root("/repo");
        assert_eq!(config.build_root, PathBuf::from("/repo/docs/source/source_build"));
        assert_eq!(
            config.version_output_dir("v1"),
            PathBuf::from("/repo/docs/source/source_build/html/versions/v1")
        );
        assert_eq!(config.versions_file, PathBuf::from("/repo/.github/versions.json"));
    }

    #[test]
    fn test_worktrees_stay_outside_docs_source() {
        let mut config = Config::for_root("/repo");
        assert_eq!(config.worktrees_dir(), PathBuf::from("/repo/.docs_worktrees"));
        assert!(!config.worktrees_dir().starts_with(config.ambient_docs_source()));

        config.set_build_root("/var/build");
        assert_eq!(config.worktrees_dir(), PathBuf::from("/var/build/worktrees"));
    }

    #[test]
    fn test_validated_replaces_zero_values() {
        let mut config = Config::for_root("/repo");
        config.max_concurrent_versions = 0;
        config.command_timeout_secs = 0;
        let config = config.validated();
        assert_eq!(config.max_concurrent_versions, 1);
        assert_eq!(config.command_timeout_secs, 1800);
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".github")).unwrap();
        std::fs::write(dir.path().join(VERSIONS_FILE_REL), "{}").unwrap();
        let nested = dir.path().join("docs/source");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(dir.path().to_path_buf()));
    }
}
