//! Global config file source: `<config dir>/premo/config.toml`

use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to the global config file, `None` when the platform has no config directory.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("premo").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> ConfigBuilder<DefaultState> {
    match path {
        Some(path) if path.is_file() => {
            debug!(config_path = %path.display(), "Loading global configuration");
            builder.add_source(File::from(path).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
