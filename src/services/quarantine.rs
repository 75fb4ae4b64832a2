//! 索引文件隔离 - 业务能力层
//!
//! 编译一种语言前，把另一种语言的索引文件复制到暂存目录再从源码树中移除，
//! 编译结束后从暂存副本恢复。暂存副本带有额外扩展名，编译器不会把它们当作源文件。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::QuarantineError;
use crate::models::Language;

/// 暂存副本的扩展名
const STAGED_EXTENSION: &str = "quarantined";

#[derive(Debug, Clone)]
struct StagedFile {
    original: PathBuf,
    staged: PathBuf,
}

/// 一次隔离的记录
///
/// 只记录实际移走的文件，恢复也只作用于这些文件。
/// 未调用 [`IndexQuarantine::restore`] 就被丢弃时会尽力恢复。
#[derive(Debug)]
pub struct IndexQuarantine {
    staging_dir: PathBuf,
    files: Vec<StagedFile>,
    restored: bool,
}

impl IndexQuarantine {
    /// 需要隐藏的索引文件：顶层索引和每个分类目录下的索引（只返回存在的文件）
    pub fn targets(docs_source: &Path, hidden: Language, categories: &[String]) -> Vec<PathBuf> {
        let filename = hidden.index_filename();
        std::iter::once(docs_source.join(&filename))
            .chain(
                categories
                    .iter()
                    .map(|category| docs_source.join(category).join(&filename)),
            )
            .filter(|path| path.is_file())
            .collect()
    }

    /// 把目标文件移入暂存目录
    ///
    /// 先复制并校验大小，再删除原文件。任何一步失败都会恢复已经移走的文件。
    pub fn stage(
        staging_dir: &Path,
        docs_source: &Path,
        targets: &[PathBuf],
    ) -> Result<Self, QuarantineError> {
        recover_orphans(staging_dir, docs_source)?;

        let mut quarantine = Self {
            staging_dir: staging_dir.to_path_buf(),
            files: Vec::with_capacity(targets.len()),
            restored: false,
        };

        for original in targets {
            let staged = staged_path(staging_dir, docs_source, original);
            if let Err(source) = stage_one(original, &staged) {
                warn!("⚠️ 暂存 {} 失败，恢复已移走的文件", original.display());
                quarantine.restore()?;
                return Err(QuarantineError::StageFailed {
                    path: original.clone(),
                    source,
                });
            }
            debug!("  暂存索引文件: {}", original.display());
            quarantine.files.push(StagedFile {
                original: original.clone(),
                staged,
            });
        }

        if !quarantine.files.is_empty() {
            info!("临时隐藏 {} 个索引文件", quarantine.files.len());
        }
        Ok(quarantine)
    }

    /// 从暂存副本恢复，返回恢复的文件数
    ///
    /// 原文件与暂存副本同时丢失时返回 [`QuarantineError::OriginalLost`]。
    pub fn restore(mut self) -> Result<usize, QuarantineError> {
        self.restored = true;
        self.restore_files()
    }

    fn restore_files(&self) -> Result<usize, QuarantineError> {
        let mut restored = 0;
        let mut first_error = None;

        for file in &self.files {
            match restore_one(file) {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("⚠️ {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if first_error.is_none() {
            let _ = fs::remove_dir_all(&self.staging_dir);
        }
        if restored > 0 {
            info!("恢复 {} 个索引文件", restored);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(restored),
        }
    }
}

impl Drop for IndexQuarantine {
    fn drop(&mut self) {
        if self.restored || self.files.is_empty() {
            return;
        }
        warn!("⚠️ 索引隔离未正常结束，尝试恢复");
        if let Err(e) = self.restore_files() {
            warn!("⚠️ 自动恢复失败: {}", e);
        }
    }
}

fn staged_path(staging_dir: &Path, docs_source: &Path, original: &Path) -> PathBuf {
    let relative = original.strip_prefix(docs_source).unwrap_or(original);
    let mut name = relative.as_os_str().to_os_string();
    name.push(".");
    name.push(STAGED_EXTENSION);
    staging_dir.join(name)
}

fn stage_one(original: &Path, staged: &Path) -> std::io::Result<()> {
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)?;
    }
    let copied = fs::copy(original, staged)?;
    let expected = fs::metadata(original)?.len();
    if copied != expected || fs::metadata(staged)?.len() != expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "暂存副本大小与原文件不一致",
        ));
    }
    fs::remove_file(original)
}

/// 恢复单个文件，返回是否执行了复制
fn restore_one(file: &StagedFile) -> Result<bool, QuarantineError> {
    if !file.staged.is_file() {
        if file.original.is_file() {
            return Ok(false);
        }
        return Err(QuarantineError::OriginalLost {
            original: file.original.clone(),
            staged: file.staged.clone(),
        });
    }

    let restore_err = |source| QuarantineError::RestoreFailed {
        original: file.original.clone(),
        source,
    };
    if let Some(parent) = file.original.parent() {
        fs::create_dir_all(parent).map_err(restore_err)?;
    }
    fs::copy(&file.staged, &file.original).map_err(restore_err)?;
    fs::remove_file(&file.staged).map_err(restore_err)?;
    Ok(true)
}

/// 恢复上一次运行中断后遗留在暂存目录里的文件
fn recover_orphans(staging_dir: &Path, docs_source: &Path) -> Result<(), QuarantineError> {
    if !staging_dir.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(staging_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let staged = entry.path();
        if staged.extension().and_then(|e| e.to_str()) != Some(STAGED_EXTENSION) {
            continue;
        }
        let Ok(relative) = staged.strip_prefix(staging_dir) else {
            continue;
        };
        let original = docs_source.join(relative.with_extension(""));
        let file = StagedFile {
            original,
            staged: staged.to_path_buf(),
        };
        if file.original.is_file() {
            let _ = fs::remove_file(&file.staged);
        } else {
            warn!("发现上次中断遗留的索引文件，恢复: {}", file.original.display());
            restore_one(&file)?;
        }
    }
    let _ = fs::remove_dir_all(staging_dir);
    Ok(())
}
