//! # Docs Builder
//!
//! 一个用于构建多版本、中英文双语文档站点的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部进程，只暴露能力
//! - `CommandRunner` - 唯一的进程启动入口，统一超时与错误
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个版本或单个语言
//! - `IsolationProvider` - 为版本准备独立源码树（git worktree）
//! - `IndexQuarantine` - 编译期间隐藏另一种语言的索引文件
//! - `VariantBuilder` - 编译单个 (版本, 语言) 组合
//! - `ArtifactMerger` - 合并两种语言的输出并改写链接
//! - `PdfPublisher` - 生成 PDF 与项目信息
//! - `SiteIndexComposer` - 写入站点入口跳转页面
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个版本"的完整构建流程
//! - `VersionCtx` - 上下文封装（版本 + 序号）
//! - `VersionFlow` - 流程编排（隔离 → 中文 → 英文 → 合并 → 发布 → 释放）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量版本构建器，管理并发与入口页面
//! - `orchestrator/summary` - 运行汇总与退出码判定
//! - `orchestrator/inspect` - 列出版本、检查配置
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::AppError;
pub use infrastructure::CommandRunner;
pub use models::{Language, VersionRegistry, VersionSpec};
pub use orchestrator::{App, RunSummary};
pub use workflow::{VersionCtx, VersionFlow, VersionOutcome, VersionState};
