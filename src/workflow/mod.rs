pub mod version_ctx;
pub mod version_flow;

pub use version_ctx::{BuildStage, VersionCtx, VersionOutcome, VersionState};
pub use version_flow::VersionFlow;
