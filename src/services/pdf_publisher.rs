//! PDF 发布服务 - 业务能力层
//!
//! 两条互斥的路径：
//! - 主路径：文档源中存在增强版 PDF 生成脚本时，按语言分别调用
//! - 回退路径：脚本不存在时，使用文档编译器的 latexpdf 目标，再回退到 LaTeX 工具链
//!
//! 无论哪条路径，`_static/` 下总会有一个下载文件（真实 PDF 或占位文本）。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::PdfError;
use crate::infrastructure::{CommandRunner, ToolCommand};
use crate::models::{Language, VersionSpec};
use crate::services::variant_builder::{compiler_command, PreparedSource};
use crate::utils::fs_utils;

/// 增强版 PDF 生成脚本（相对于文档源目录）
pub const PRIMARY_GENERATOR: &str = "pdf_generator_enhanced_v2.py";
/// 固定的下载文件名，前端无法读取项目信息时使用
pub const FALLBACK_PDF_NAME: &str = "sdk-docs.pdf";
/// 所有方式都失败时写入的占位内容
pub const PLACEHOLDER_TEXT: &str = "PDF文件正在生成中，请稍后重试...";

/// LaTeX 主文件名（不含扩展名）
const LATEX_MAIN_STEM: &str = "sdk-docs";

/// 回退工具链，按优先级排列；每一项是依次执行的参数列表
const LATEX_CHAIN: &[(&str, &[&[&str]])] = &[
    (
        "latexmk",
        &[&["-pdf", "-silent", "-interaction=nonstopmode"]],
    ),
    ("tectonic", &[&[]]),
    (
        "pdflatex",
        &[&["-interaction=nonstopmode"], &["-interaction=nonstopmode"]],
    ),
];

/// 前端读取的项目信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    #[serde(rename = "projectName")]
    pub project_name: String,
    #[serde(rename = "pdfFileName")]
    pub pdf_file_name: String,
}

/// PDF 发布结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfReport {
    /// 成功生成 PDF 的语言
    pub produced: Vec<Language>,
    /// 规范文件名下的 PDF
    pub canonical: Option<PathBuf>,
    /// 是否写入了占位文件
    pub placeholder: bool,
}

/// 回退工具链中的一个工具
#[derive(Debug, Clone)]
struct LatexTool {
    program: String,
    passes: &'static [&'static [&'static str]],
}

pub struct PdfPublisher {
    runner: CommandRunner,
    python: String,
    latexpdf_root: PathBuf,
    latex_root: PathBuf,
    latex_chain: Vec<LatexTool>,
}

impl PdfPublisher {
    pub fn new(config: &Config, runner: CommandRunner) -> Self {
        Self {
            runner,
            python: config.python.clone(),
            latexpdf_root: config.build_root.join("latexpdf"),
            latex_root: config.build_root.join("latex"),
            latex_chain: LATEX_CHAIN
                .iter()
                .map(|&(program, passes)| LatexTool {
                    program: program.to_string(),
                    passes,
                })
                .collect(),
        }
    }

    /// 为合并后的版本目录生成 PDF 和项目信息文件
    ///
    /// 单个语言失败只记录日志；只有写文件失败才返回错误。
    pub async fn publish(
        &self,
        merged: &Path,
        prepared: &PreparedSource,
        spec: &VersionSpec,
    ) -> Result<PdfReport> {
        let static_dir = merged.join("_static");
        tokio::fs::create_dir_all(&static_dir)
            .await
            .with_context(|| format!("无法创建 {}", static_dir.display()))?;

        let project_name = prepared.project.project_name();
        let script = prepared.docs_source.join(PRIMARY_GENERATOR);

        let produced = if script.is_file() {
            info!("[版本 {}] 📄 使用增强版 PDF 生成器", spec.name);
            self.run_primary(&script, merged, &static_dir, project_name, spec)
                .await
        } else {
            info!("[版本 {}] 📄 未找到 PDF 生成器，使用 LaTeX 回退", spec.name);
            match self.run_fallback(&prepared.docs_source, spec).await {
                Ok(pdf) => vec![(Language::SECONDARY, pdf)],
                Err(e) => {
                    warn!("[版本 {}] ⚠️ {}", spec.name, e);
                    Vec::new()
                }
            }
        };

        let pdf_file_name = format!("{}.pdf", prepared.project.slug());
        let mut report = PdfReport {
            produced: produced.iter().map(|(lang, _)| *lang).collect(),
            ..Default::default()
        };

        let source = Language::BUILD_ORDER
            .iter()
            .find_map(|lang| produced.iter().find(|(l, _)| l == lang))
            .map(|(_, path)| path.clone());

        match source {
            Some(source) => {
                let canonical = static_dir.join(&pdf_file_name);
                copy_unless_same(&source, &canonical).await?;
                copy_unless_same(&source, &static_dir.join(FALLBACK_PDF_NAME)).await?;
                info!("[版本 {}] ✓ PDF: {}", spec.name, canonical.display());
                report.canonical = Some(canonical);
            }
            None => {
                warn!("[版本 {}] ⚠️ 未生成 PDF，创建占位文件", spec.name);
                let placeholder = static_dir.join(FALLBACK_PDF_NAME);
                tokio::fs::write(&placeholder, PLACEHOLDER_TEXT)
                    .await
                    .with_context(|| format!("无法写入 {}", placeholder.display()))?;
                report.placeholder = true;
            }
        }

        let info = ProjectInfo {
            project_name: project_name.to_string(),
            pdf_file_name,
        };
        write_project_info(&static_dir, &info).await?;
        Ok(report)
    }

    async fn run_primary(
        &self,
        script: &Path,
        merged: &Path,
        static_dir: &Path,
        project_name: &str,
        spec: &VersionSpec,
    ) -> Vec<(Language, PathBuf)> {
        let mut produced = Vec::new();
        for language in Language::BUILD_ORDER {
            let command = ToolCommand::new(&self.python)
                .arg(script)
                .arg("--html-dir")
                .arg(merged)
                .arg("--output-dir")
                .arg(static_dir)
                .args(["--title", project_name, "--language", language.tag()])
                .current_dir(merged);

            match self.runner.run(&command).await {
                Ok(_) => {
                    let expected = static_dir.join(primary_output_name(project_name, language));
                    if expected.is_file() {
                        info!("[版本 {}] ✓ {} PDF 生成成功", spec.name, language);
                        produced.push((language, expected));
                    } else {
                        warn!("[版本 {}] ⚠️ {}", spec.name, PdfError::ArtifactMissing { expected });
                    }
                }
                Err(e) => {
                    let err = PdfError::GeneratorFailed {
                        language: language.tag().to_string(),
                        reason: e.to_string(),
                    };
                    warn!("[版本 {}] ⚠️ {}", spec.name, err);
                }
            }
        }
        produced
    }

    /// latexpdf 目标，失败后改为 latex + 工具链
    async fn run_fallback(&self, docs_source: &Path, spec: &VersionSpec) -> Result<PathBuf, PdfError> {
        let latexpdf_dir = self.latexpdf_root.join(&spec.url_path);
        clear_output(&latexpdf_dir)?;
        let command = compiler_command(&self.python, "latexpdf", &[], docs_source, &latexpdf_dir);
        match self.runner.run(&command).await {
            Ok(_) => {
                if let Some(pdf) = find_pdf(&latexpdf_dir).await {
                    return Ok(pdf);
                }
                warn!("[版本 {}] latexpdf 完成但没有找到 PDF", spec.name);
            }
            Err(e) => warn!("[版本 {}] latexpdf 失败，回退到 LaTeX 构建: {}", spec.name, e),
        }

        let latex_dir = self.latex_root.join(&spec.url_path);
        clear_output(&latex_dir)?;
        let command = compiler_command(&self.python, "latex", &[], docs_source, &latex_dir);
        if let Err(e) = self.runner.run(&command).await {
            warn!("[版本 {}] LaTeX 构建失败: {}", spec.name, e);
            return Err(PdfError::ToolchainExhausted);
        }

        let main_tex = find_main_tex(&latex_dir)
            .await
            .ok_or_else(|| PdfError::ArtifactMissing {
                expected: latex_dir.join(format!("{}.tex", LATEX_MAIN_STEM)),
            })?;
        let tex_name = main_tex
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for tool in &self.latex_chain {
            if !CommandRunner::is_available(&tool.program) {
                info!("[版本 {}] 跳过 {}（未安装）", spec.name, tool.program);
                continue;
            }
            if self
                .run_passes(&tool.program, tool.passes, &tex_name, &latex_dir)
                .await
            {
                if let Some(pdf) = find_pdf(&latex_dir).await {
                    info!("[版本 {}] ✓ {} 编译成功", spec.name, tool.program);
                    return Ok(pdf);
                }
            }
        }
        Err(PdfError::ToolchainExhausted)
    }

    async fn run_passes(&self, tool: &str, passes: &[&[&str]], tex_name: &str, dir: &Path) -> bool {
        for args in passes {
            let command = ToolCommand::new(tool)
                .args(args.iter())
                .arg(tex_name)
                .current_dir(dir);
            if let Err(e) = self.runner.run(&command).await {
                warn!("{} 失败: {}", tool, e);
                return false;
            }
        }
        true
    }
}

/// 增强版生成器的输出文件名
pub fn primary_output_name(project_name: &str, language: Language) -> String {
    match language {
        Language::Zh => format!("{}.pdf", project_name),
        Language::En => format!("{}_EN.pdf", project_name.replace(' ', "_")),
    }
}

async fn find_with_extension(dir: &Path, preferred: &str, extension: &str) -> Option<PathBuf> {
    let preferred = dir.join(preferred);
    if preferred.is_file() {
        return Some(preferred);
    }
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            candidates.push(path);
        }
    }
    candidates.sort();
    candidates.into_iter().next()
}

async fn find_pdf(dir: &Path) -> Option<PathBuf> {
    find_with_extension(dir, &format!("{}.pdf", LATEX_MAIN_STEM), "pdf").await
}

async fn find_main_tex(dir: &Path) -> Option<PathBuf> {
    find_with_extension(dir, &format!("{}.tex", LATEX_MAIN_STEM), "tex").await
}

/// 每次回退构建前清空输出目录，旧的 PDF 不能冒充本次产物
fn clear_output(dir: &Path) -> Result<(), PdfError> {
    fs_utils::remove_dir_if_exists(dir).map_err(|source| PdfError::StaleOutput {
        path: dir.to_path_buf(),
        source,
    })
}

async fn copy_unless_same(source: &Path, target: &Path) -> Result<()> {
    let same = match (source.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same {
        tokio::fs::copy(source, target)
            .await
            .with_context(|| format!("无法复制 PDF 到 {}", target.display()))?;
    }
    Ok(())
}

async fn write_project_info(static_dir: &Path, info: &ProjectInfo) -> Result<()> {
    let json = serde_json::to_string(info)?;
    let json_path = static_dir.join("project_info.json");
    tokio::fs::write(&json_path, &json)
        .await
        .with_context(|| format!("无法写入 {}", json_path.display()))?;

    let js_path = static_dir.join("project_info.js");
    tokio::fs::write(&js_path, format!("window.projectInfo = {};\n", json))
        .await
        .with_context(|| format!("无法写入 {}", js_path.display()))?;
    Ok(())
}
