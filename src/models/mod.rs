pub mod language;
pub mod loaders;
pub mod project;
pub mod version;

pub use language::Language;
pub use loaders::{
    load_project_config, load_project_config_with_fallback, load_version_registry,
    parse_version_registry,
};
pub use project::ProjectConfig;
pub use version::{VersionRegistry, VersionSpec};
