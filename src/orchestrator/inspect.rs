//! 检查命令：列出版本、检查配置
//!
//! 只读，不创建任何构建目录。

use crate::config::Config;
use crate::error::ConfigError;
use crate::infrastructure::{CommandRunner, ToolCommand};
use crate::models::loaders::project_loader::PROJECT_CONFIG_FILE;
use crate::models::loaders::registry_loader::try_load_version_registry;
use crate::models::{load_project_config, VersionRegistry};
use crate::services::pdf_publisher::PRIMARY_GENERATOR;
use crate::services::variant_builder::{CONTENT_GENERATOR, METADATA_EMBEDDER};

/// 外部 LaTeX 工具
const LATEX_TOOLS: &[&str] = &["latexmk", "tectonic", "pdflatex"];

/// 列出所有版本，注册表无法加载时返回错误
pub async fn list_versions(config: &Config) -> Result<VersionRegistry, ConfigError> {
    let registry = try_load_version_registry(&config.versions_file).await?;

    println!("可用版本:");
    for version in &registry.versions {
        println!(
            "  - {} ({}) -> {}  [{}]",
            version.display_name, version.name, version.branch, version.url_path
        );
    }
    for rejected in &registry.rejected {
        println!(
            "  ✗ #{} {}: {}",
            rejected.index, rejected.name, rejected.reason
        );
    }
    Ok(registry)
}

/// 检查配置与外部工具，返回配置是否可用
pub async fn check_config(config: &Config) -> bool {
    println!("配置检查:");
    println!("  项目根目录: {}", config.project_root.display());
    println!("  版本配置: {}", config.versions_file.display());
    println!("  构建目录: {}", config.build_root.display());

    let registry = match try_load_version_registry(&config.versions_file).await {
        Ok(registry) => registry,
        Err(e) => {
            println!("  ✗ {}", e);
            return false;
        }
    };

    let mut ok = registry.rejected.is_empty();
    println!(
        "  默认版本: {}",
        designator_status(&registry.default_version, registry.default_version().is_some())
    );
    println!(
        "  最新版本: {}",
        designator_status(&registry.latest_version, registry.latest_version().is_some())
    );
    println!(
        "  版本数量: {} (拒绝 {})",
        registry.versions.len(),
        registry.rejected.len()
    );
    if registry.default_version().is_none() {
        println!("  ⚠️ 入口页面将跳转到 'latest'");
        ok = false;
    }

    let docs_source = config.ambient_docs_source();
    let project_config = docs_source.join(PROJECT_CONFIG_FILE);
    if project_config.is_file() {
        let project = load_project_config(&docs_source).await;
        println!("  项目名称: {} ({})", project.project_name(), project.slug());
    } else {
        println!("  ⚠️ 未找到 {}，使用默认项目配置", project_config.display());
    }

    println!("外部工具:");
    for script in [CONTENT_GENERATOR, METADATA_EMBEDDER, PRIMARY_GENERATOR] {
        println!("  {} {}", mark(docs_source.join(script).is_file()), script);
    }
    println!("  {} git", mark(CommandRunner::is_available("git")));
    let sphinx = sphinx_available(config).await;
    println!("  {} {} -m sphinx", mark(sphinx), config.python);
    ok &= sphinx;
    for tool in LATEX_TOOLS {
        println!("  {} {}", mark(CommandRunner::is_available(tool)), tool);
    }

    ok
}

async fn sphinx_available(config: &Config) -> bool {
    let runner = CommandRunner::new(std::time::Duration::from_secs(30));
    let command = ToolCommand::new(&config.python).args(["-m", "sphinx", "--version"]);
    runner.run(&command).await.is_ok()
}

fn designator_status(name: &str, resolved: bool) -> String {
    match (name.is_empty(), resolved) {
        (true, _) => "(未设置)".to_string(),
        (false, true) => format!("{} ✓", name),
        (false, false) => format!("{} ✗ 不在版本列表中", name),
    }
}

fn mark(available: bool) -> &'static str {
    if available {
        "✓"
    } else {
        "✗"
    }
}
