//! 版本构建上下文
//!
//! 封装"我正在构建第几个版本、是哪个版本"这一信息，以及版本的状态机。

use std::fmt::Display;

use serde::Serialize;

use crate::models::VersionSpec;
use crate::services::{MergeReport, PdfReport, TreeKind};

/// 版本构建上下文
#[derive(Debug, Clone)]
pub struct VersionCtx {
    pub spec: VersionSpec,

    /// 版本序号（从1开始，仅用于日志显示）
    pub index: usize,

    pub total: usize,
}

impl VersionCtx {
    pub fn new(spec: VersionSpec, index: usize, total: usize) -> Self {
        Self { spec, index, total }
    }
}

impl Display for VersionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[版本 {}]", self.spec.name)
    }
}

/// 失败发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// 注册表校验（条目被拒绝）
    Validate,
    Isolate,
    Prepare,
    BuildZh,
    BuildEn,
    Merge,
    Publish,
}

impl Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildStage::Validate => "校验",
            BuildStage::Isolate => "隔离",
            BuildStage::Prepare => "准备",
            BuildStage::BuildZh => "构建中文",
            BuildStage::BuildEn => "构建英文",
            BuildStage::Merge => "合并",
            BuildStage::Publish => "发布",
        };
        f.write_str(name)
    }
}

/// 版本状态
///
/// `Pending → Isolated → BuiltZh → BuiltEn → Merged → Published`，
/// 任何阶段失败都进入 `Failed`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VersionState {
    Pending,
    Isolated,
    BuiltZh,
    BuiltEn,
    Merged,
    Published,
    Failed { stage: BuildStage, reason: String },
}

impl VersionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VersionState::Published | VersionState::Failed { .. })
    }
}

/// 单个版本的构建结果
#[derive(Debug, Clone, Serialize)]
pub struct VersionOutcome {
    pub name: String,
    pub display_name: String,
    pub url_path: String,
    pub state: VersionState,
    /// 失败前到达的最后一个状态
    pub last_reached: VersionState,
    pub tree_kind: Option<TreeKind>,
    pub merge: Option<MergeReport>,
    pub pdf: Option<PdfReport>,
    pub duration_secs: f64,
}

impl VersionOutcome {
    pub fn new(spec: &VersionSpec) -> Self {
        Self {
            name: spec.name.clone(),
            display_name: spec.display_name.clone(),
            url_path: spec.url_path.clone(),
            state: VersionState::Pending,
            last_reached: VersionState::Pending,
            tree_kind: None,
            merge: None,
            pdf: None,
            duration_secs: 0.0,
        }
    }

    /// 被注册表拒绝的条目
    pub fn rejected(name: &str, reason: &str) -> Self {
        let mut outcome = Self {
            name: name.to_string(),
            display_name: name.to_string(),
            url_path: String::new(),
            state: VersionState::Pending,
            last_reached: VersionState::Pending,
            tree_kind: None,
            merge: None,
            pdf: None,
            duration_secs: 0.0,
        };
        outcome.fail(BuildStage::Validate, reason);
        outcome
    }

    /// 进入下一个状态；终止状态不再变化
    pub fn advance(&mut self, state: VersionState) {
        if self.state.is_terminal() {
            return;
        }
        self.last_reached = state.clone();
        self.state = state;
    }

    pub fn fail(&mut self, stage: BuildStage, reason: impl Display) {
        if self.state.is_terminal() {
            return;
        }
        self.state = VersionState::Failed {
            stage,
            reason: reason.to_string(),
        };
    }

    pub fn is_published(&self) -> bool {
        self.state == VersionState::Published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> VersionSpec {
        VersionSpec {
            name: "v1".to_string(),
            display_name: "V1".to_string(),
            branch: "v1".to_string(),
            url_path: "v1".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_failure_keeps_last_reached_state() {
        let mut outcome = VersionOutcome::new(&spec());
        outcome.advance(VersionState::Isolated);
        outcome.advance(VersionState::BuiltZh);
        outcome.fail(BuildStage::BuildEn, "exit 2");
        outcome.advance(VersionState::BuiltEn);

        assert_eq!(outcome.last_reached, VersionState::BuiltZh);
        assert!(matches!(
            outcome.state,
            VersionState::Failed { stage: BuildStage::BuildEn, .. }
        ));
        assert!(!outcome.is_published());
    }

    #[test]
    fn test_ctx_display_prefix() {
        let ctx = VersionCtx::new(spec(), 1, 2);
        assert_eq!(ctx.to_string(), "[版本 v1]");
    }

    #[test]
    fn test_rejected_outcome_is_failed() {
        let outcome = VersionOutcome::rejected("v9", "branch 为空");
        assert!(matches!(
            outcome.state,
            VersionState::Failed { stage: BuildStage::Validate, .. }
        ));
    }
}
