//! Configuration System
//!
//! Layered configuration for hosts embedding the presentation model runtime.
//! Sources are merged in order of increasing precedence: built-in defaults,
//! the global file (`<config dir>/premo/config.toml`), the project file
//! (`<root>/premo.toml`), then `PREMO__*` environment variables such as
//! `PREMO__PERSISTENCE__ENABLED=false`.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::pm::description::PmDescription;
use crate::state::{
    FileStorage, JsonFormat, MemoryStorage, NoopSaverFactory, SnapshotSaverFactory,
    SnapshotStorage, StateSaverFactory,
};
use config::Environment;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::{project_config_path, PROJECT_CONFIG_FILE};

pub const DEFAULT_ENV_PREFIX: &str = "PREMO";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PremoConfig {
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PremoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.persistence.validate()?;
        self.logging.validate()
    }
}

/// Where and how the presentation model tree is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Persist the tree at all. When off, saves go nowhere.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Snapshot file. Defaults to `<data dir>/premo/snapshot.json`.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Pretty-print snapshot JSON
    #[serde(default)]
    pub pretty: bool,

    /// Reject snapshots whose digest does not match
    #[serde(default = "default_true")]
    pub verify_digest: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_path: None,
            pretty: false,
            verify_digest: true,
        }
    }
}

impl PersistenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "persistence.snapshot_path must not be empty".to_string(),
                ));
            }
            if path.file_name().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "persistence.snapshot_path must name a file: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Resolved snapshot file path
    pub fn snapshot_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.snapshot_path {
            return Ok(path.clone());
        }
        BaseDirs::new()
            .map(|dirs| dirs.data_dir().join("premo").join("snapshot.json"))
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "no data directory available, set persistence.snapshot_path".to_string(),
                )
            })
    }

    /// File storage at [`snapshot_path`](Self::snapshot_path), or memory when disabled
    pub fn build_storage(&self) -> Result<Box<dyn SnapshotStorage>, ConfigError> {
        self.validate()?;
        if !self.enabled {
            return Ok(Box::new(MemoryStorage::new()));
        }
        Ok(Box::new(FileStorage::new(self.snapshot_path()?)))
    }

    pub fn build_saver_factory<D: PmDescription>(&self) -> Box<dyn StateSaverFactory<D>> {
        if !self.enabled {
            return Box::new(NoopSaverFactory::default());
        }
        Box::new(SnapshotSaverFactory::<D, _>::new(JsonFormat {
            pretty: self.pretty,
            verify_digest: self.verify_digest,
        }))
    }
}

/// Loads [`PremoConfig`] from layered sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    global_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            global_path: global_config_path(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Override the global file location; `None` skips the global layer.
    pub fn with_global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Merge every layer for the project at `project_root`
    pub fn load(&self, project_root: &Path) -> Result<PremoConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder, self.global_path.as_deref());
        let builder = sources::workspace_file::add_to_builder(builder, project_root);
        let builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config: PremoConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(
            project_root = %project_root.display(),
            persistence = config.persistence.enabled,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Defaults overlaid with a single file, no other layers
    pub fn load_from_file(path: &Path) -> Result<PremoConfig, ConfigError> {
        let config: PremoConfig = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
