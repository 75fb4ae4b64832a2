//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责所有版本的构建调度与统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量版本构建器
//! - 管理一次运行的生命周期（清理、加载、构建、汇总）
//! - 控制并发数量（Semaphore）
//! - 所有版本结束后写入站点入口页面
//!
//! ### `summary` - 运行汇总
//! - 每个版本的最终状态与失败阶段
//! - 日志文本与 `build_summary.json`
//!
//! ### `inspect` - 检查命令
//! - 列出版本、检查配置与外部工具
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<VersionSpec>)
//!     ↓
//! workflow::VersionFlow (处理单个版本)
//!     ↓
//! services (能力层：isolation / variant_builder / artifact_merger / pdf_publisher)
//!     ↓
//! infrastructure (基础设施：CommandRunner)
//! ```

pub mod batch_processor;
pub mod inspect;
pub mod summary;

pub use batch_processor::App;
pub use inspect::{check_config, list_versions};
pub use summary::RunSummary;
