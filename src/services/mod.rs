//! 业务能力层（Services）
//!
//! 每个服务只描述"我能对一个版本做什么"，不关心版本之间的顺序与统计。

pub mod artifact_merger;
pub mod html_localizer;
pub mod isolation;
pub mod pdf_publisher;
pub mod quarantine;
pub mod site_index;
pub mod variant_builder;
pub mod version_info;

pub use artifact_merger::{ArtifactMerger, FixupOutcome, MergeReport};
pub use html_localizer::HtmlLocalizer;
pub use isolation::{IsolatedTree, IsolationProvider, TreeKind};
pub use pdf_publisher::{PdfPublisher, PdfReport, ProjectInfo};
pub use quarantine::IndexQuarantine;
pub use site_index::SiteIndexComposer;
pub use variant_builder::{PreparedSource, VariantBuilder};
pub use version_info::write_version_metadata;
