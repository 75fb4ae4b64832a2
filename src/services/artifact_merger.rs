//! 产物合并服务 - 业务能力层
//!
//! 把两种语言的 HTML 输出合并到一个目录：
//! - 默认语言（英文）保持原文件名，只修正 `lang` 属性与界面文本
//! - 次要语言（中文）的 HTML 文件加 `_zh` 后缀，并改写文件内的站内链接
//! - 以 `.` 开头的目录（编译器内部目录）整体跳过
//! - 非 HTML 文件原样复制，后复制的次要语言覆盖同名文件

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{AppError, MergeFileError};
use crate::models::Language;
use crate::services::html_localizer::{is_markup, localized_file_name, HtmlLocalizer};
use crate::utils::fs_utils;

/// 单个 HTML 文件的修复结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixupOutcome {
    /// 语言修复已应用
    Applied,
    /// 修复失败，原样复制
    Passthrough,
}

/// 合并统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    /// 修复成功的 HTML 文件数
    pub applied: usize,
    /// 原样复制的 HTML 文件（相对于目标目录）
    pub passthrough: Vec<PathBuf>,
    /// 原样复制的非 HTML 文件数
    pub assets: usize,
}

impl MergeReport {
    fn record(&mut self, outcome: FixupOutcome, relative: &Path) {
        match outcome {
            FixupOutcome::Applied => self.applied += 1,
            FixupOutcome::Passthrough => self.passthrough.push(relative.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactMerger {
    localizer: HtmlLocalizer,
}

impl ArtifactMerger {
    pub fn new() -> Result<Self> {
        let localizer = HtmlLocalizer::new().context("无法编译 HTML 修复规则")?;
        Ok(Self { localizer })
    }

    /// 合并两种语言的输出到 `target_dir`，完成后删除两个源目录
    ///
    /// 目标目录会先被清空，重复合并得到相同结果。
    pub async fn merge(
        &self,
        default_dir: &Path,
        secondary_dir: &Path,
        target_dir: &Path,
    ) -> Result<MergeReport> {
        let merger = self.clone();
        let (default_dir, secondary_dir, target_dir) = (
            default_dir.to_path_buf(),
            secondary_dir.to_path_buf(),
            target_dir.to_path_buf(),
        );

        let report = tokio::task::spawn_blocking(move || {
            merger.merge_blocking(&default_dir, &secondary_dir, &target_dir)
        })
        .await
        .context("合并任务异常结束")??;
        Ok(report)
    }

    pub fn merge_blocking(
        &self,
        default_dir: &Path,
        secondary_dir: &Path,
        target_dir: &Path,
    ) -> Result<MergeReport> {
        fs_utils::remove_dir_if_exists(target_dir)
            .map_err(|e| AppError::io(target_dir, e))?;
        fs::create_dir_all(target_dir).map_err(|e| AppError::io(target_dir, e))?;

        let mut report = MergeReport::default();
        self.copy_variant(default_dir, target_dir, Language::DEFAULT, &mut report)
            .with_context(|| format!("复制 {} 文档失败", Language::DEFAULT))?;
        self.copy_variant(secondary_dir, target_dir, Language::SECONDARY, &mut report)
            .with_context(|| format!("复制 {} 文档失败", Language::SECONDARY))?;

        for dir in [default_dir, secondary_dir] {
            if let Err(e) = fs_utils::remove_dir_if_exists(dir) {
                warn!("⚠️ 无法删除中间目录 {}: {}", dir.display(), e);
            }
        }

        info!(
            "✓ 文档集合并完成: 修复 {} 个页面, 复制 {} 个资源文件",
            report.applied, report.assets
        );
        if !report.passthrough.is_empty() {
            warn!("⚠️ {} 个页面未能修复，已原样复制", report.passthrough.len());
        }
        Ok(report)
    }

    fn copy_variant(
        &self,
        source_dir: &Path,
        target_dir: &Path,
        language: Language,
        report: &mut MergeReport,
    ) -> Result<(), AppError> {
        let walker = WalkDir::new(source_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_internal_dir(e));

        for entry in walker {
            let entry = entry.map_err(|e| AppError::io(source_dir, e.into()))?;
            let Ok(relative) = entry.path().strip_prefix(source_dir) else {
                continue;
            };

            if entry.file_type().is_dir() {
                let dir = target_dir.join(relative);
                fs::create_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if is_markup(&file_name) {
                let renamed = relative.with_file_name(localized_file_name(&file_name, language));
                let target = target_dir.join(&renamed);
                let outcome = self.fix_markup_file(entry.path(), &target, language)?;
                report.record(outcome, &renamed);
            } else {
                let target = target_dir.join(relative);
                fs::copy(entry.path(), &target).map_err(|e| AppError::io(&target, e))?;
                report.assets += 1;
            }
        }
        Ok(())
    }

    /// 修复单个 HTML 文件；读写失败时原样复制
    pub fn fix_markup_file(
        &self,
        source: &Path,
        target: &Path,
        language: Language,
    ) -> Result<FixupOutcome, AppError> {
        match self.try_fix_markup_file(source, target, language) {
            Ok(()) => Ok(FixupOutcome::Applied),
            Err(e) => {
                warn!("⚠️ 修复HTML文件语言配置失败: {}", e);
                fs::copy(source, target).map_err(|e| AppError::io(target, e))?;
                debug!("原样复制: {}", target.display());
                Ok(FixupOutcome::Passthrough)
            }
        }
    }

    fn try_fix_markup_file(
        &self,
        source: &Path,
        target: &Path,
        language: Language,
    ) -> Result<(), MergeFileError> {
        let content = fs::read_to_string(source).map_err(|source_err| MergeFileError::ReadFailed {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let fixed = self.localizer.localize(&content, language);
        fs::write(target, fixed).map_err(|source| MergeFileError::WriteFailed {
            path: target.to_path_buf(),
            source,
        })
    }
}

fn is_internal_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}
