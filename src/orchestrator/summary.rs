//! 构建结果汇总

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::utils::logging::truncate_text;
use crate::workflow::{VersionOutcome, VersionState};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 整次运行的汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub total: usize,
    pub published: usize,
    pub failed: usize,
    pub versions: Vec<VersionOutcome>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Local>, versions: Vec<VersionOutcome>) -> Self {
        let published = versions.iter().filter(|v| v.is_published()).count();
        Self {
            started_at: started_at.format(TIME_FORMAT).to_string(),
            finished_at: Local::now().format(TIME_FORMAT).to_string(),
            total: versions.len(),
            published,
            failed: versions.len() - published,
            versions,
        }
    }

    /// 没有配置任何版本（0/0）
    pub fn is_vacuous(&self) -> bool {
        self.total == 0
    }

    /// 退出码判定：所有配置的版本都已发布（0/0 也算成功）
    pub fn all_published(&self) -> bool {
        self.failed == 0
    }

    /// 文本形式，追加到日志文件
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "\n{}", "=".repeat(60));
        let _ = writeln!(text, "构建完成: {}/{} 个版本成功", self.published, self.total);
        let _ = writeln!(text, "开始时间: {}", self.started_at);
        let _ = writeln!(text, "完成时间: {}", self.finished_at);
        let _ = writeln!(text, "{}", "=".repeat(60));
        if self.is_vacuous() {
            let _ = writeln!(text, "没有配置任何版本");
        }
        for outcome in &self.versions {
            let _ = writeln!(text, "{}", outcome_line(outcome));
        }
        text
    }

    /// 输出到日志
    pub fn log(&self, log_file_path: &Path) {
        info!("\n{}", "=".repeat(60));
        info!("📊 全部构建完成统计");
        info!("完成时间: {}", self.finished_at);
        info!("{}", "=".repeat(60));
        for outcome in &self.versions {
            if outcome.is_published() {
                info!("{}", outcome_line(outcome));
            } else {
                warn!("{}", outcome_line(outcome));
            }
        }
        if self.is_vacuous() {
            warn!("⚠️ 没有配置任何版本 (0/0)");
        } else {
            info!("✅ 成功: {}/{}", self.published, self.total);
            info!("❌ 失败: {}", self.failed);
        }
        info!("{}", "=".repeat(60));
        info!("\n日志已保存至: {}", log_file_path.display());
    }

    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("无法写入 {}", path.display()))
    }
}

fn outcome_line(outcome: &VersionOutcome) -> String {
    match &outcome.state {
        VersionState::Published => format!(
            "✓ {} ({}) -> {} [{:.1}s]",
            outcome.display_name, outcome.name, outcome.url_path, outcome.duration_secs
        ),
        VersionState::Failed { stage, reason } => format!(
            "✗ {} ({}) 在{}阶段失败: {}",
            outcome.display_name,
            outcome.name,
            stage,
            truncate_text(reason, 200)
        ),
        other => format!("? {} ({}) 停在 {:?}", outcome.display_name, outcome.name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VersionSpec;
    use crate::workflow::BuildStage;

    fn outcome(name: &str, published: bool) -> VersionOutcome {
        let spec = VersionSpec {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            branch: name.to_string(),
            url_path: name.to_string(),
            description: String::new(),
        };
        let mut outcome = VersionOutcome::new(&spec);
        if published {
            outcome.advance(VersionState::Published);
        } else {
            outcome.fail(BuildStage::Isolate, "分支不存在");
        }
        outcome
    }

    #[test]
    fn test_counts_and_exit_decision() {
        let summary = RunSummary::new(Local::now(), vec![outcome("v1", true), outcome("v2", false)]);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_published());
        let text = summary.render();
        assert!(text.contains("1/2"));
        assert!(text.contains("V2 (v2) 在隔离阶段失败: 分支不存在"));
    }

    #[test]
    fn test_zero_versions_is_vacuous_success() {
        let summary = RunSummary::new(Local::now(), Vec::new());
        assert!(summary.is_vacuous());
        assert!(summary.all_published());
        assert!(summary.render().contains("没有配置任何版本"));
    }
}
