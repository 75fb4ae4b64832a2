use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则默认 `info`，详细模式下为 `debug`。
/// 重复调用是安全的（测试中可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &Path) -> Result<()> {
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_header = format!(
        "{}\n文档构建日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法创建日志文件 {}", log_file_path.display()))?;
    Ok(())
}

/// 追加内容到日志文件
pub fn append_log(log_file_path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多版本文档构建");
    info!("📁 项目根目录: {}", config.project_root.display());
    info!("📦 构建目录: {}", config.build_root.display());
    info!("📊 最大并发版本数: {}", config.max_concurrent_versions);
    info!("{}", "=".repeat(60));
}

/// 记录版本加载信息
///
/// # 参数
/// - `total`: 版本总数
/// - `max_concurrent`: 最大并发数
pub fn log_versions_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待构建的版本", total);
    if max_concurrent > 1 {
        info!("📋 将以每批 {} 个的方式构建", max_concurrent);
        info!("💡 同一批内的版本并行构建，批次之间串行\n");
    }
}

/// 记录批次开始信息
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始构建第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批版本: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批结束: {}/{} 个版本已发布", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 截断失败原因等长文本（按字符计数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
