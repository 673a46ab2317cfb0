//! State Persistence
//!
//! Save/restore protocol for presentation model trees: per-node savers, the
//! snapshot tree they belong to, wire formats and storage media.

pub mod factory;
pub mod format;
pub mod saver;
pub mod snapshot;
pub mod storage;

pub use factory::{NoopSaverFactory, SnapshotSaverFactory, StateSaverFactory};
pub use format::{JsonFormat, WireFormat, SNAPSHOT_VERSION};
pub use saver::{MapStateSaver, NoopStateSaver, StateSaver};
pub use snapshot::{PmSnapshot, TagPath};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};
