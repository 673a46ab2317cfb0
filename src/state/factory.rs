//! State saver factories
//!
//! A factory hands out one [`StateSaver`] per node path for the duration of a
//! save/restore cycle and owns the snapshot tree those savers belong to.

use crate::error::PersistError;
use crate::pm::description::PmDescription;
use crate::state::format::{JsonFormat, WireFormat};
use crate::state::saver::{NoopStateSaver, StateSaver};
use crate::state::snapshot::{PmSnapshot, TagPath};
use std::marker::PhantomData;

pub trait StateSaverFactory<D: PmDescription> {
    /// Start a new save cycle. The next cycle's tree fully replaces the previous one.
    fn reset(&mut self);

    /// Saver for the node at `path`, created on first request and cached for the
    /// rest of the cycle. `description` is recorded for nodes seen the first time.
    fn create_saver(&mut self, path: &TagPath, description: &D) -> &mut dyn StateSaver;

    /// Encode the current tree. `None` when there is nothing to persist.
    fn save(&self) -> Result<Option<Vec<u8>>, PersistError>;

    /// Parse `bytes` into the in-memory tree, replacing it.
    fn restore(&mut self, bytes: &[u8]) -> Result<(), PersistError>;

    /// Root of the current tree
    fn root(&self) -> Option<&PmSnapshot<D>>;
}

/// Factory keeping the snapshot tree in memory and encoding it with `W`
#[derive(Debug)]
pub struct SnapshotSaverFactory<D, W = JsonFormat> {
    format: W,
    root: Option<PmSnapshot<D>>,
}

impl<D: PmDescription> SnapshotSaverFactory<D, JsonFormat> {
    pub fn json() -> Self {
        Self::new(JsonFormat::default())
    }
}

impl<D: PmDescription> Default for SnapshotSaverFactory<D, JsonFormat> {
    fn default() -> Self {
        Self::json()
    }
}

impl<D: PmDescription, W: WireFormat> SnapshotSaverFactory<D, W> {
    pub fn new(format: W) -> Self {
        Self { format, root: None }
    }

    pub fn format(&self) -> &W {
        &self.format
    }

    /// Walk to `path`, inserting missing nodes in request order.
    ///
    /// Parents are always requested before their children, so only the last
    /// segment is ever new and takes the caller's description.
    fn node_mut(&mut self, path: &TagPath, description: &D) -> &mut PmSnapshot<D> {
        let segments = path.segments();
        let root_tag = segments.first().cloned().unwrap_or_default();
        if self.root.as_ref().is_some_and(|root| root.tag != root_tag) {
            self.root = None;
        }

        let mut node = self
            .root
            .get_or_insert_with(|| PmSnapshot::new(root_tag, description.clone()));
        for tag in segments.iter().skip(1) {
            let index = match node.children.iter().position(|child| child.tag == *tag) {
                Some(index) => index,
                None => {
                    node.children
                        .push(PmSnapshot::new(tag.clone(), description.clone()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node
    }
}

impl<D: PmDescription, W: WireFormat> StateSaverFactory<D> for SnapshotSaverFactory<D, W> {
    fn reset(&mut self) {
        self.root = None;
    }

    fn create_saver(&mut self, path: &TagPath, description: &D) -> &mut dyn StateSaver {
        &mut self.node_mut(path, description).state
    }

    fn save(&self) -> Result<Option<Vec<u8>>, PersistError> {
        match &self.root {
            Some(root) => self.format.encode(root).map(Some),
            None => Ok(None),
        }
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        self.root = Some(self.format.decode(bytes)?);
        Ok(())
    }

    fn root(&self) -> Option<&PmSnapshot<D>> {
        self.root.as_ref()
    }
}

/// Factory for hosts that do not persist anything
#[derive(Debug)]
pub struct NoopSaverFactory<D> {
    saver: NoopStateSaver,
    _description: PhantomData<fn() -> D>,
}

impl<D> Default for NoopSaverFactory<D> {
    fn default() -> Self {
        Self {
            saver: NoopStateSaver,
            _description: PhantomData,
        }
    }
}

impl<D: PmDescription> StateSaverFactory<D> for NoopSaverFactory<D> {
    fn reset(&mut self) {}

    fn create_saver(&mut self, _path: &TagPath, _description: &D) -> &mut dyn StateSaver {
        &mut self.saver
    }

    fn save(&self) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(None)
    }

    fn restore(&mut self, _bytes: &[u8]) -> Result<(), PersistError> {
        Ok(())
    }

    fn root(&self) -> Option<&PmSnapshot<D>> {
        None
    }
}
