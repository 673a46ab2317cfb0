//! Error types for the presentation model runtime.

use crate::state::snapshot::TagPath;
use thiserror::Error;

/// Lifecycle misuse. Always a programmer error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Presentation model already created: {0}")]
    AlreadyCreated(TagPath),

    #[error("Presentation model not created yet: {0}")]
    NotCreated(TagPath),

    #[error("Presentation model is running one of its own hooks: {0}")]
    Busy(TagPath),
}

/// Typed access to a state saver failed
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to serialize state key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to deserialize state key '{key}': {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid state for key '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Snapshot persistence errors. Recoverable: the delegate reports them and
/// keeps running on in-memory state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode snapshot: {0}")]
    Encode(String),

    #[error("Failed to decode snapshot: {0}")]
    Decode(String),

    #[error("Incompatible snapshot version: expected {expected}, found {found}")]
    IncompatibleVersion { expected: u32, found: u32 },

    #[error("Snapshot digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Failed to restore state of {path}: {source}")]
    State {
        path: TagPath,
        #[source]
        source: StateError,
    },
}

/// Top-level error returned by tree and delegate operations
#[derive(Debug, Error)]
pub enum PmError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Child tag '{tag}' under {parent} is already bound to a different description")]
    DuplicateTag { parent: TagPath, tag: String },

    #[error("{hook} hook failed for {path}: {source}")]
    Hook {
        path: TagPath,
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("No tokio runtime available to launch work for {0}")]
    NoRuntime(TagPath),
}

impl PmError {
    /// Persistence and state errors are reported to the host instead of aborting it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PmError::State(_) | PmError::Persist(_))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
