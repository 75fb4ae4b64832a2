//! 命令行参数

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

/// 多版本中英文文档构建工具
#[derive(Debug, Parser)]
#[command(name = "docs-builder", version, about)]
pub struct Cli {
    /// 构建前删除整个构建目录
    #[arg(long)]
    pub clean: bool,

    /// 只列出配置的版本，不构建
    #[arg(long, conflicts_with = "check_config")]
    pub list_versions: bool,

    /// 只检查配置与外部工具，不构建
    #[arg(long)]
    pub check_config: bool,

    /// 项目根目录（默认向上查找 .github/versions.json）
    #[arg(long, env = "DOCS_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// 同时构建的版本数量
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// 单个外部命令的超时时间（秒）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 显示详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖环境变量配置
    pub fn apply(&self, config: Config) -> Config {
        self.apply_with_env(config, |name| std::env::var(name).ok())
    }

    /// 同 [`Cli::apply`]，环境变量通过 `var` 读取
    pub fn apply_with_env<F>(&self, mut config: Config, var: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = &self.project_root {
            if *root != config.project_root {
                config = Config {
                    python: config.python,
                    default_remote: config.default_remote,
                    command_timeout_secs: config.command_timeout_secs,
                    max_concurrent_versions: config.max_concurrent_versions,
                    verbose_logging: config.verbose_logging,
                    ..Config::for_root(root)
                };
                config.apply_path_overrides(var);
            }
        }
        if let Some(jobs) = self.jobs {
            config.max_concurrent_versions = jobs;
        }
        if let Some(timeout) = self.timeout {
            config.command_timeout_secs = timeout;
        }
        if self.verbose {
            config.verbose_logging = true;
        }
        config.validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "docs-builder",
            "--project-root",
            "/tmp/project",
            "--jobs",
            "0",
            "--timeout",
            "60",
            "--verbose",
        ]);
        let config = cli.apply_with_env(Config::for_root("/elsewhere"), |_| None);

        assert_eq!(config.project_root, PathBuf::from("/tmp/project"));
        assert_eq!(
            config.versions_file,
            PathBuf::from("/tmp/project/.github/versions.json")
        );
        assert_eq!(
            config.build_root,
            PathBuf::from("/tmp/project/docs/source/source_build")
        );
        assert_eq!(config.max_concurrent_versions, 1);
        assert_eq!(config.command_timeout_secs, 60);
        assert!(config.verbose_logging);
    }

    #[test]
    fn test_project_root_keeps_path_overrides() {
        let cli = Cli::parse_from(["docs-builder", "--project-root", "/tmp/project"]);
        let env = |name: &str| match name {
            "DOCS_VERSIONS_FILE" => Some("/etc/docs/versions.json".to_string()),
            "DOCS_BUILD_ROOT" => Some("/var/build".to_string()),
            "DOCS_BUILD_LOG" => Some("/var/log/docs.log".to_string()),
            _ => None,
        };
        let config = cli.apply_with_env(Config::for_root("/elsewhere"), env);

        assert_eq!(config.project_root, PathBuf::from("/tmp/project"));
        assert_eq!(config.versions_file, PathBuf::from("/etc/docs/versions.json"));
        assert_eq!(config.build_root, PathBuf::from("/var/build"));
        assert_eq!(config.output_log_file, PathBuf::from("/var/log/docs.log"));
    }

    #[test]
    fn test_numeric_flags_do_not_read_env() {
        // 数值环境变量由 Config::from_env 宽松解析，非法值只告警
        let command = Cli::command();
        for id in ["jobs", "timeout"] {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id().as_str() == id)
                .unwrap();
            assert!(arg.get_env().is_none(), "{} 不应绑定环境变量", id);
        }
    }

    #[test]
    fn test_inspection_flags_conflict() {
        assert!(Cli::try_parse_from(["docs-builder", "--list-versions", "--check-config"]).is_err());
    }
}
