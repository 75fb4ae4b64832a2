//! 批量版本构建器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责所有版本的构建调度和结果汇总。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：记录启动信息，可选清理构建目录
//! 2. **加载版本**：读取版本注册表（失败时降级为空列表）
//! 3. **并发控制**：使用 Semaphore 限制同时构建的版本数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **入口页面**：所有版本处理完后写入站点跳转页面
//! 6. **全局统计**：汇总每个版本的最终状态，写入日志与 JSON
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个版本的细节，委托 `VersionFlow`
//! - **错误隔离**：单个版本的任何失败都不会中断整次运行

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::CommandRunner;
use crate::models::{load_version_registry, VersionRegistry, VersionSpec};
use crate::orchestrator::summary::RunSummary;
use crate::services::{IsolationProvider, SiteIndexComposer};
use crate::utils::{fs_utils, logging};
use crate::workflow::{BuildStage, VersionCtx, VersionFlow, VersionOutcome};

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 构建所有版本
    pub async fn run(&self, clean: bool) -> Result<RunSummary> {
        let started_at = chrono::Local::now();

        if clean {
            self.clean().await?;
        }
        tokio::fs::create_dir_all(self.config.versions_root())
            .await
            .with_context(|| format!("无法创建构建目录 {}", self.config.build_root.display()))?;
        logging::init_log_file(&self.config.output_log_file)?;

        // 加载版本注册表
        let registry = Arc::new(self.load_registry().await);
        let mut outcomes: Vec<VersionOutcome> = registry
            .rejected
            .iter()
            .map(|r| VersionOutcome::rejected(&r.name, &r.reason))
            .collect();

        if registry.is_empty() {
            warn!("⚠️ 没有可构建的版本");
        } else {
            logging::log_versions_loaded(
                registry.versions.len(),
                self.config.max_concurrent_versions,
            );
            outcomes.extend(self.build_all_versions(registry.clone()).await?);
        }

        // 只要配置了版本，即使全部失败也写入入口页面
        if registry.configured_count() > 0 {
            let composer =
                SiteIndexComposer::new(self.config.site_root(), self.config.versions_root());
            if let Err(e) = composer.compose(&registry).await {
                error!("✗ 写入入口页面失败: {:#}", e);
            }
        }

        let summary = RunSummary::new(started_at, outcomes);
        self.report(&summary).await;
        Ok(summary)
    }

    async fn load_registry(&self) -> VersionRegistry {
        info!("\n📁 正在加载版本配置: {}", self.config.versions_file.display());
        load_version_registry(&self.config.versions_file).await
    }

    /// 构建所有版本（分批并发）
    async fn build_all_versions(
        &self,
        registry: Arc<VersionRegistry>,
    ) -> Result<Vec<VersionOutcome>> {
        let flow = Arc::new(VersionFlow::new(&self.config, registry.clone())?);
        let max_concurrent = self.config.max_concurrent_versions;
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let versions = &registry.versions;
        let total = versions.len();
        let total_batches = total.div_ceil(max_concurrent);
        let mut outcomes = Vec::with_capacity(total);

        for batch_start in (0..total).step_by(max_concurrent) {
            let batch_end = (batch_start + max_concurrent).min(total);
            let batch_num = batch_start / max_concurrent + 1;
            if total_batches > 1 {
                logging::log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);
            }

            let batch = self
                .build_batch(
                    &flow,
                    &versions[batch_start..batch_end],
                    batch_start,
                    total,
                    semaphore.clone(),
                )
                .await?;

            if total_batches > 1 {
                let success = batch.iter().filter(|o| o.is_published()).count();
                logging::log_batch_complete(batch_num, success, batch.len());
            }
            outcomes.extend(batch);
        }

        Ok(outcomes)
    }

    /// 构建单个批次
    async fn build_batch(
        &self,
        flow: &Arc<VersionFlow>,
        batch: &[VersionSpec],
        batch_start: usize,
        total: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<Vec<VersionOutcome>> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, spec) in batch.iter().enumerate() {
            let ctx = VersionCtx::new(spec.clone(), batch_start + idx + 1, total);
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = flow.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                flow.run(&ctx).await
            }));
        }

        let results = futures::future::join_all(handles).await;
        let outcomes = results
            .into_iter()
            .zip(batch)
            .map(|(result, spec)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("[版本 {}] 任务执行失败: {}", spec.name, e);
                    let mut outcome = VersionOutcome::new(spec);
                    outcome.fail(BuildStage::Isolate, format!("任务执行失败: {}", e));
                    outcome
                }
            })
            .collect();
        Ok(outcomes)
    }

    /// 删除构建目录与隔离工作树目录，并同步 git 的 worktree 记录
    pub async fn clean(&self) -> Result<()> {
        let worktrees_dir = self.config.worktrees_dir();
        for dir in [&self.config.build_root, &worktrees_dir] {
            if is_same_or_ancestor(dir, &self.config.project_root) {
                bail!("拒绝清理 {}：它包含项目根目录", dir.display());
            }
        }

        info!("🧹 清理构建目录: {}", self.config.build_root.display());
        for dir in [&self.config.build_root, &worktrees_dir] {
            fs_utils::remove_dir_if_exists(dir)
                .with_context(|| format!("无法删除 {}", dir.display()))?;
        }

        let runner = CommandRunner::new(self.config.command_timeout());
        IsolationProvider::new(&self.config, runner).prune().await;
        Ok(())
    }

    async fn report(&self, summary: &RunSummary) {
        summary.log(&self.config.output_log_file);
        if let Err(e) = logging::append_log(&self.config.output_log_file, &summary.render()) {
            warn!("⚠️ 无法写入日志文件: {}", e);
        }
        let summary_file = self.config.summary_file();
        if let Err(e) = summary.write_json(&summary_file).await {
            warn!("⚠️ 无法写入构建汇总: {:#}", e);
        }
    }
}

fn is_same_or_ancestor(candidate: &Path, path: &Path) -> bool {
    let candidate = std::path::absolute(candidate).unwrap_or_else(|_| candidate.to_path_buf());
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    path.starts_with(candidate)
}
