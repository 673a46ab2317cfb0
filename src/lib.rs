//! Premo: Lifecycle-Aware Presentation Model Trees
//!
//! Application UI state lives in a tree of presentation models, each created
//! from a serializable description. A host forwards its own lifecycle to a
//! [`PmDelegate`], which drives create, foreground, background and destroy
//! through the tree, routes messages and back navigation, and saves the whole
//! tree so it can be rebuilt after the process dies.

pub mod config;
pub mod delegate;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod message;
pub mod pm;
pub mod state;

pub use config::{ConfigLoader, PersistenceConfig, PremoConfig};
pub use delegate::PmDelegate;
pub use error::{ConfigError, LifecycleError, PersistError, PmError, StateError};
pub use lifecycle::{LifecycleEvent, PmLifecycle, PmLifecycleState};
pub use logging::{init_logging, LoggingConfig};
pub use message::{BackMessage, PmMessage, PmMessageHandler};
pub use pm::{
    PmArgs, PmContext, PmDescription, PmFactory, PmId, PmScope, PmTree, PresentationModel,
};
pub use state::{
    FileStorage, JsonFormat, MapStateSaver, MemoryStorage, NoopSaverFactory, NoopStateSaver,
    PmSnapshot, SnapshotSaverFactory, SnapshotStorage, StateSaver, StateSaverFactory, TagPath,
    WireFormat,
};
