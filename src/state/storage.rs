//! Storage media for encoded snapshots

use crate::error::PersistError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where encoded snapshot bytes live between process runs
pub trait SnapshotStorage {
    /// Previously written bytes, `None` if nothing was written yet
    fn read(&self) -> Result<Option<Vec<u8>>, PersistError>;
    /// Replace the stored bytes
    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistError>;
    fn clear(&mut self) -> Result<(), PersistError>;
}

/// Keeps the last snapshot in memory. Useful for tests and for hosts that hand
/// the bytes to a platform store themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    bytes: Option<Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes: Some(bytes) }
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.bytes.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        self.bytes = None;
        Ok(())
    }
}

/// Snapshot stored in a single file.
///
/// Writes go to `<file>.tmp` first and are renamed over the target, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Io(e)),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            PersistError::Io(e)
        })?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::Io(e)),
        }
    }
}
