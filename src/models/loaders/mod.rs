pub mod project_loader;
pub mod registry_loader;

pub use project_loader::{load_project_config, load_project_config_with_fallback};
pub use registry_loader::{load_version_registry, parse_version_registry};
