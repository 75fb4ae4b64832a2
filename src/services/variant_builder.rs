//! 语言变体构建服务 - 业务能力层
//!
//! 负责单个 (版本, 语言) 组合的 HTML 构建：
//! 1. `prepare`：准备文档源目录并运行可选的内容生成脚本（每个版本一次）
//! 2. `build`：隐藏另一种语言的索引文件，调用文档编译器，恢复索引文件

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{CommandRunner, ToolCommand};
use crate::models::{load_project_config_with_fallback, Language, ProjectConfig, VersionSpec};
use crate::services::isolation::IsolatedTree;
use crate::services::quarantine::IndexQuarantine;
use crate::utils::fs_utils;

/// 内容生成脚本（相对于文档源目录）
pub const CONTENT_GENERATOR: &str = "doc_generator.py";
/// 版本元数据嵌入脚本（相对于文档源目录）
pub const METADATA_EMBEDDER: &str = "utils/embed_version_config.py";

/// 编译器没有生成英文搜索翻译时写入的内容
const EN_TRANSLATIONS_FALLBACK: &str = r#"const TRANSLATIONS = {
    "locale": "en_US",
    "messages": {
        "Search": "Search",
        "Searching": "Searching",
        "Search Results": "Search Results",
        "Search finished, found %s page(s) matching the search query.": "Search finished, found %s page(s) matching the search query.",
        "Search didn't return any results. Please try again with different keywords.": "Search didn't return any results. Please try again with different keywords.",
        "Search Results for": "Search Results for",
        "Searching for": "Searching for"
    }
};
"#;

/// 构建文档编译器（sphinx）命令，`defines` 是 `-D key=value` 覆盖项
pub fn compiler_command(
    python: &str,
    builder: &str,
    defines: &[String],
    source: &Path,
    output: &Path,
) -> ToolCommand {
    let mut command = ToolCommand::new(python).args(["-m", "sphinx.cmd.build", "-b", builder]);
    for define in defines {
        command = command.arg("-D").arg(define);
    }
    command.arg(source).arg(output).current_dir(source)
}

/// 已准备好的文档源
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub docs_source: PathBuf,
    pub project: ProjectConfig,
}

pub struct VariantBuilder {
    runner: CommandRunner,
    python: String,
    docs_source_dir: PathBuf,
    ambient_docs_source: PathBuf,
    build_root: PathBuf,
    variants_dir: PathBuf,
    quarantine_dir: PathBuf,
}

impl VariantBuilder {
    pub fn new(config: &Config, runner: CommandRunner) -> Self {
        Self {
            runner,
            python: config.python.clone(),
            docs_source_dir: config.docs_source_dir.clone(),
            ambient_docs_source: config.ambient_docs_source(),
            build_root: config.build_root.clone(),
            variants_dir: config.variants_dir(),
            quarantine_dir: config.quarantine_dir(),
        }
    }

    /// 变体输出目录
    pub fn variant_dir(&self, spec: &VersionSpec, language: Language) -> PathBuf {
        self.variants_dir.join(&spec.url_path).join(language.tag())
    }

    /// 源码树中的文档源目录
    pub fn docs_source_for(&self, tree: &IsolatedTree) -> PathBuf {
        if tree.is_ambient() {
            self.ambient_docs_source.clone()
        } else {
            tree.path.join(&self.docs_source_dir)
        }
    }

    /// `prepare` 是否需要读取主工作树的文档源（工作树缺少文档源目录）
    pub fn needs_ambient_copy(&self, tree: &IsolatedTree) -> bool {
        !tree.is_ambient() && !self.docs_source_for(tree).is_dir()
    }

    /// 准备文档源目录
    ///
    /// 工作树中没有文档源目录时，从主工作树复制一份（跳过构建输出目录）。
    pub async fn prepare(&self, tree: &IsolatedTree, spec: &VersionSpec) -> Result<PreparedSource> {
        let docs_source = self.docs_source_for(tree);

        if !docs_source.is_dir() {
            self.clone_ambient_docs_source(&docs_source, spec).await?;
        }

        self.run_optional_script(&docs_source, CONTENT_GENERATOR, spec)
            .await?;
        self.run_optional_script(&docs_source, METADATA_EMBEDDER, spec)
            .await?;

        let project = load_project_config_with_fallback(&docs_source, &self.ambient_docs_source).await;
        info!(
            "[版本 {}] 项目: {} (分类: {:?})",
            spec.name,
            project.project_name(),
            project.categories()
        );

        Ok(PreparedSource {
            docs_source,
            project,
        })
    }

    async fn clone_ambient_docs_source(&self, docs_source: &Path, spec: &VersionSpec) -> Result<()> {
        warn!(
            "[版本 {}] ⚠️ 工作树中没有文档源目录，使用主分支的文档结构",
            spec.name
        );
        if !self.ambient_docs_source.is_dir() {
            bail!(
                "主工作树也没有文档源目录: {}",
                self.ambient_docs_source.display()
            );
        }

        let src = self.ambient_docs_source.clone();
        let dst = docs_source.to_path_buf();
        let excluded = vec![self.build_root.clone()];
        let copied =
            tokio::task::spawn_blocking(move || fs_utils::copy_dir_excluding(&src, &dst, &excluded))
                .await
                .context("复制文档源目录的任务异常结束")?
                .with_context(|| format!("无法复制文档源目录到 {}", docs_source.display()))?;
        info!("[版本 {}] 已复制 {} 个文件", spec.name, copied);
        Ok(())
    }

    async fn run_optional_script(
        &self,
        docs_source: &Path,
        script: &str,
        spec: &VersionSpec,
    ) -> Result<()> {
        let path = docs_source.join(script);
        if !path.is_file() {
            return Ok(());
        }
        info!("[版本 {}] 运行脚本: {}", spec.name, script);
        let command = ToolCommand::new(&self.python)
            .arg(&path)
            .current_dir(docs_source);
        self.runner
            .run(&command)
            .await
            .with_context(|| format!("脚本 {} 执行失败", script))?;
        Ok(())
    }

    /// 构建一种语言的 HTML
    ///
    /// 无论编译是否成功都会恢复被隐藏的索引文件；恢复失败优先于编译失败上报。
    pub async fn build(
        &self,
        prepared: &PreparedSource,
        spec: &VersionSpec,
        language: Language,
    ) -> Result<PathBuf> {
        let output = self.variant_dir(spec, language);
        fs_utils::remove_dir_if_exists(&output)
            .with_context(|| format!("无法清理旧的变体目录 {}", output.display()))?;

        let docs_source = &prepared.docs_source;
        let targets =
            IndexQuarantine::targets(docs_source, language.other(), prepared.project.categories());
        let staging_dir = self
            .quarantine_dir
            .join(format!("{}-{}", spec.url_path, language));
        let quarantine = IndexQuarantine::stage(&staging_dir, docs_source, &targets)
            .with_context(|| format!("[版本 {}] 无法隐藏 {} 索引文件", spec.name, language.other()))?;

        let command = self.variant_command(docs_source, &output, language);
        info!("[版本 {}] 🔨 构建 {} 文档: {}", spec.name, language, output.display());
        let compiled = self.runner.run(&command).await;

        quarantine
            .restore()
            .with_context(|| format!("[版本 {}] 恢复索引文件失败", spec.name))?;
        compiled.with_context(|| format!("[版本 {}] {} 文档编译失败", spec.name, language))?;

        self.check_translations(&output, language, spec).await?;
        Ok(output)
    }

    fn variant_command(&self, docs_source: &Path, output: &Path, language: Language) -> ToolCommand {
        let master_doc = language.master_doc();
        let defines = [
            format!("language={}", language.compiler_locale()),
            format!("master_doc={}", master_doc),
        ];
        compiler_command(&self.python, "html", &defines, docs_source, output)
            .env("SPHINX_MASTER_DOC", &master_doc)
            .env("SPHINX_MASTER_DOC_OVERRIDE", &master_doc)
            .env("SPHINX_LANGUAGE", language.compiler_locale())
            .env("SPHINX_EXCLUDE_PATTERNS", language.exclude_pattern())
            .env("LANG", language.process_locale())
            .env("LC_ALL", language.process_locale())
            .env("LC_CTYPE", language.process_locale())
    }

    /// 检查搜索翻译文件，英文缺失时写入默认内容
    async fn check_translations(&self, output: &Path, language: Language, spec: &VersionSpec) -> Result<()> {
        let translations = output.join("_static").join("translations.js");
        match (language, tokio::fs::read_to_string(&translations).await) {
            (Language::Zh, Ok(content)) => {
                if !content.contains("zh_Hans_CN") && !content.contains("zh_CN") {
                    warn!("[版本 {}] ⚠️ 翻译文件可能不包含正确的中文 locale 信息", spec.name);
                }
            }
            (Language::Zh, Err(_)) => {
                warn!("[版本 {}] ⚠️ 中文翻译文件未生成", spec.name);
            }
            (Language::En, Ok(_)) => {}
            (Language::En, Err(_)) => {
                warn!("[版本 {}] ⚠️ 英文翻译文件未生成，写入默认内容", spec.name);
                if let Some(parent) = translations.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&translations, EN_TRANSLATIONS_FALLBACK)
                    .await
                    .with_context(|| format!("无法写入 {}", translations.display()))?;
            }
        }
        Ok(())
    }
}
