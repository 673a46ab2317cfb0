//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("persistence.enabled", true)?
        .set_default("persistence.pretty", false)?
        .set_default("persistence.verify_digest", true)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}
