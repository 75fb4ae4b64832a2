//! 版本构建流程 - 流程层
//!
//! 核心职责：定义"一个版本"的完整构建流程
//!
//! 流程顺序：
//! 1. 隔离：为版本准备源码树
//! 2. 准备：文档源目录、内容生成脚本
//! 3. 构建中文 → 构建英文
//! 4. 合并两种语言
//! 5. 发布：版本元数据、PDF
//! 6. 释放源码树（无论前面是否成功）

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::CommandRunner;
use crate::models::{Language, VersionRegistry};
use crate::services::{
    write_version_metadata, ArtifactMerger, IsolatedTree, IsolationProvider, PdfPublisher,
    PreparedSource, VariantBuilder,
};
use crate::workflow::version_ctx::{BuildStage, VersionCtx, VersionOutcome, VersionState};

type StageResult<T> = std::result::Result<T, (BuildStage, anyhow::Error)>;

trait StageContext<T> {
    fn stage(self, stage: BuildStage) -> StageResult<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: BuildStage) -> StageResult<T> {
        self.map_err(|e| (stage, e))
    }
}

/// 版本构建流程
///
/// - 编排单个版本的完整构建
/// - 决定阶段顺序和失败后的处理
/// - 保证源码树一定被释放
pub struct VersionFlow {
    isolation: IsolationProvider,
    builder: VariantBuilder,
    merger: ArtifactMerger,
    pdf: PdfPublisher,
    registry: Arc<VersionRegistry>,
    config: Config,
    /// 主工作树的文档源同一时间只能被一个版本使用：
    /// 在主工作树上构建的版本，以及需要从主工作树复制文档源的版本
    ambient_lock: Mutex<()>,
}

impl VersionFlow {
    pub fn new(config: &Config, registry: Arc<VersionRegistry>) -> Result<Self> {
        let runner = CommandRunner::new(config.command_timeout());
        Ok(Self {
            isolation: IsolationProvider::new(config, runner.clone()),
            builder: VariantBuilder::new(config, runner.clone()),
            merger: ArtifactMerger::new()?,
            pdf: PdfPublisher::new(config, runner),
            registry,
            config: config.clone(),
            ambient_lock: Mutex::new(()),
        })
    }

    /// 构建一个版本，返回最终状态
    pub async fn run(&self, ctx: &VersionCtx) -> VersionOutcome {
        let started = Instant::now();
        let mut outcome = VersionOutcome::new(&ctx.spec);
        log_version_start(ctx);

        let tree = match self.isolation.acquire(&ctx.spec).await {
            Ok(tree) => tree,
            Err(e) => {
                error!("{} ❌ 无法准备源码树: {}", ctx, e);
                outcome.fail(BuildStage::Isolate, &e);
                self.release(ctx, &self.isolation.worktree_path(&ctx.spec))
                    .await;
                outcome.duration_secs = started.elapsed().as_secs_f64();
                return outcome;
            }
        };
        outcome.tree_kind = Some(tree.kind);
        outcome.advance(VersionState::Isolated);
        if tree.is_ambient() {
            info!("{} 使用主工作树: {}", ctx, tree.path.display());
        }

        let stages = {
            let _ambient_guard = if tree.is_ambient() {
                Some(self.ambient_lock.lock().await)
            } else {
                None
            };
            self.run_stages(ctx, &tree, &mut outcome).await
        };
        if let Err((stage, e)) = stages {
            error!("{} ❌ {}阶段失败: {:#}", ctx, stage, e);
            outcome.fail(stage, format!("{:#}", e));
        }

        self.release(ctx, &tree.path).await;
        outcome.duration_secs = started.elapsed().as_secs_f64();

        if outcome.is_published() {
            info!(
                "{} ✅ 构建成功 ({:.1}s)",
                ctx, outcome.duration_secs
            );
        }
        outcome
    }

    async fn run_stages(
        &self,
        ctx: &VersionCtx,
        tree: &IsolatedTree,
        outcome: &mut VersionOutcome,
    ) -> StageResult<()> {
        let spec = &ctx.spec;

        let prepared = {
            // 复制主工作树的文档源时，主工作树上不能有正在隐藏索引文件的构建
            let _ambient_guard = if self.builder.needs_ambient_copy(tree) {
                Some(self.ambient_lock.lock().await)
            } else {
                None
            };
            self.builder
                .prepare(tree, spec)
                .await
                .stage(BuildStage::Prepare)?
        };

        let mut variant_dirs: Vec<(Language, PathBuf)> = Vec::with_capacity(2);
        for language in Language::BUILD_ORDER {
            let (stage, reached) = match language {
                Language::Zh => (BuildStage::BuildZh, VersionState::BuiltZh),
                Language::En => (BuildStage::BuildEn, VersionState::BuiltEn),
            };
            let dir = self
                .builder
                .build(&prepared, spec, language)
                .await
                .stage(stage)?;
            info!("{} ✓ {} 文档构建完成", ctx, language);
            variant_dirs.push((language, dir));
            outcome.advance(reached);
        }

        let variant = |language: Language| {
            variant_dirs
                .iter()
                .find(|(l, _)| *l == language)
                .map(|(_, dir)| dir.clone())
                .unwrap_or_else(|| self.builder.variant_dir(spec, language))
        };
        let merged = self.config.version_output_dir(&spec.url_path);
        info!("{} 🔀 合并文档集: {}", ctx, merged.display());
        let report = self
            .merger
            .merge(
                &variant(Language::DEFAULT),
                &variant(Language::SECONDARY),
                &merged,
            )
            .await
            .stage(BuildStage::Merge)?;
        outcome.merge = Some(report);
        outcome.advance(VersionState::Merged);

        self.publish(ctx, &merged, &prepared, outcome)
            .await
            .stage(BuildStage::Publish)?;
        outcome.advance(VersionState::Published);
        Ok(())
    }

    async fn publish(
        &self,
        ctx: &VersionCtx,
        merged: &std::path::Path,
        prepared: &PreparedSource,
        outcome: &mut VersionOutcome,
    ) -> Result<()> {
        write_version_metadata(merged, &self.registry, &ctx.spec, &prepared.project).await?;
        let report = self.pdf.publish(merged, prepared, &ctx.spec).await?;
        outcome.pdf = Some(report);
        Ok(())
    }

    async fn release(&self, ctx: &VersionCtx, path: &std::path::Path) {
        if let Err(e) = self.isolation.release(path).await {
            warn!("{} ⚠️ 清理源码树失败: {}", ctx, e);
        }
    }
}

fn log_version_start(ctx: &VersionCtx) {
    info!("\n{}", "=".repeat(40));
    info!(
        "构建版本 {}/{}: {} ({})",
        ctx.index, ctx.total, ctx.spec.display_name, ctx.spec.branch
    );
    info!("{}", "=".repeat(40));
}
