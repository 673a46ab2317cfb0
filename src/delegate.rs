//! Host bridge for one presentation model tree
//!
//! A host (window, screen, test harness) owns exactly one [`PmDelegate`] and
//! forwards its own lifecycle to it. The delegate creates or restores the root,
//! drives lifecycle transitions through the tree, and saves the tree through a
//! [`StateSaverFactory`] into a [`SnapshotStorage`].

use crate::config::PremoConfig;
use crate::error::{ConfigError, LifecycleError, PersistError, PmError};
use crate::pm::description::{PmArgs, PmDescription, PmFactory};
use crate::pm::tree::{PmId, PmTree};
use crate::state::factory::{NoopSaverFactory, StateSaverFactory};
use crate::state::snapshot::TagPath;
use crate::state::storage::{MemoryStorage, SnapshotStorage};
use std::fmt;
use tracing::{debug, error, info, warn};

pub type ErrorHandler = Box<dyn FnMut(&PmError)>;

fn log_error(error: &PmError) {
    error!(error = %error, recoverable = error.is_recoverable(), "Presentation model error");
}

pub struct PmDelegate<D: PmDescription> {
    args: PmArgs<D>,
    tree: PmTree<D>,
    saver_factory: Box<dyn StateSaverFactory<D>>,
    storage: Box<dyn SnapshotStorage>,
    error_handler: ErrorHandler,
    destroyed: bool,
}

impl<D: PmDescription> fmt::Debug for PmDelegate<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PmDelegate")
            .field("args", &self.args)
            .field("tree", &self.tree)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl<D: PmDescription> PmDelegate<D> {
    /// Delegate without persistence: saves are discarded and every start is fresh.
    pub fn new(args: PmArgs<D>, factory: impl PmFactory<D> + 'static) -> Self {
        Self {
            args,
            tree: PmTree::new(factory),
            saver_factory: Box::new(NoopSaverFactory::default()),
            storage: Box::new(MemoryStorage::new()),
            error_handler: Box::new(log_error),
            destroyed: false,
        }
    }

    /// Delegate wired from the persistence section of `config`
    pub fn from_config(
        args: PmArgs<D>,
        factory: impl PmFactory<D> + 'static,
        config: &PremoConfig,
    ) -> Result<Self, ConfigError> {
        let persistence = &config.persistence;
        Ok(Self::new(args, factory).with_persistence(
            persistence.build_saver_factory(),
            persistence.build_storage()?,
        ))
    }

    pub fn with_persistence(
        mut self,
        saver_factory: Box<dyn StateSaverFactory<D>>,
        storage: Box<dyn SnapshotStorage>,
    ) -> Self {
        self.saver_factory = saver_factory;
        self.storage = storage;
        self
    }

    /// Replace the handler receiving persistence failures. The default logs them.
    pub fn with_error_handler(mut self, handler: impl FnMut(&PmError) + 'static) -> Self {
        self.error_handler = Box::new(handler);
        self
    }

    pub fn args(&self) -> &PmArgs<D> {
        &self.args
    }

    pub fn root(&self) -> Option<PmId> {
        self.tree.root()
    }

    pub fn tree(&self) -> &PmTree<D> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut PmTree<D> {
        &mut self.tree
    }

    pub fn storage(&self) -> &dyn SnapshotStorage {
        self.storage.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Restore the tree from storage, or build a fresh root, then run `on_create`
    /// top-down. A snapshot that cannot be read, rebuilt or created again is
    /// reported to the error handler and replaced by a fresh root.
    pub fn on_create(&mut self) -> Result<PmId, PmError> {
        if self.destroyed || self.tree.root().is_some() {
            return Err(LifecycleError::AlreadyCreated(self.root_path()).into());
        }

        let restored = match self.restore() {
            Ok(restored) => restored,
            Err(e) => {
                self.discard_restored(None, PmError::Persist(e));
                None
            }
        };

        if let Some(root) = restored {
            match self.tree.create(root) {
                Ok(()) => {
                    info!(tag = %self.args.tag, nodes = self.tree.len(), "Presentation model tree created");
                    return Ok(root);
                }
                Err(e) => {
                    let e = PersistError::Decode(format!("restored tree rejected: {}", e));
                    self.discard_restored(Some(root), PmError::Persist(e));
                }
            }
        }

        let root = self.tree.set_root(&self.args)?;
        self.tree.create(root)?;
        info!(tag = %self.args.tag, nodes = self.tree.len(), "Presentation model tree created");
        Ok(root)
    }

    /// Tear down whatever a failed restore left behind and report why
    fn discard_restored(&mut self, root: Option<PmId>, error: PmError) {
        warn!(error = %error, "Snapshot restore failed, starting fresh");
        if let Some(root) = root {
            if let Err(e) = self.tree.destroy(root) {
                debug!(error = %e, "Teardown of restored tree failed");
            }
        }
        self.tree.clear();
        self.report(&error);
    }

    fn restore(&mut self) -> Result<Option<PmId>, PersistError> {
        let Some(bytes) = self.storage.read()? else {
            debug!("No snapshot stored");
            return Ok(None);
        };
        self.saver_factory.restore(&bytes)?;
        let Some(snapshot) = self.saver_factory.root() else {
            return Ok(None);
        };
        if snapshot.tag != self.args.tag {
            return Err(PersistError::Decode(format!(
                "snapshot root '{}' does not match root tag '{}'",
                snapshot.tag, self.args.tag
            )));
        }
        let root = self.tree.rebuild(snapshot)?;
        info!(nodes = self.tree.len(), "Presentation model tree restored");
        Ok(Some(root))
    }

    pub fn on_foreground(&mut self) -> Result<(), PmError> {
        match self.live_root()? {
            Some(root) => self.tree.foreground(root),
            None => Ok(()),
        }
    }

    pub fn on_background(&mut self) -> Result<(), PmError> {
        match self.live_root()? {
            Some(root) => self.tree.background(root),
            None => Ok(()),
        }
    }

    /// Destroy the whole tree. Later lifecycle calls are no-ops.
    pub fn on_destroy(&mut self) -> Result<(), PmError> {
        let Some(root) = self.live_root()? else {
            return Ok(());
        };
        self.destroyed = true;
        let result = self.tree.destroy(root);
        info!(tag = %self.args.tag, "Presentation model tree destroyed");
        result
    }

    /// Save every node and write the snapshot. Failures go to the error handler
    /// and leave the in-memory tree untouched.
    pub fn on_save(&mut self) {
        if self.destroyed || self.tree.root().is_none() {
            return;
        }
        match self.save() {
            Ok(Some(bytes)) => info!(bytes, "Presentation model tree saved"),
            Ok(None) => debug!("Nothing to persist"),
            Err(e) => {
                warn!(error = %e, "Saving presentation model tree failed");
                self.report(&PmError::Persist(e));
            }
        }
    }

    fn save(&mut self) -> Result<Option<usize>, PersistError> {
        let nodes = self.tree.save_into(self.saver_factory.as_mut())?;
        debug!(nodes, "Presentation models saved");
        match self.saver_factory.save()? {
            Some(bytes) => {
                self.storage.write(&bytes)?;
                Ok(Some(bytes.len()))
            }
            None => Ok(None),
        }
    }

    /// System back. `false` means nothing consumed it and the host should run
    /// its default action.
    pub fn handle_back(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        match self.tree.root() {
            Some(root) => self.tree.handle_back(root),
            None => false,
        }
    }

    /// Root to drive, `None` once destroyed, `NotCreated` before `on_create`
    fn live_root(&self) -> Result<Option<PmId>, PmError> {
        if self.destroyed {
            return Ok(None);
        }
        match self.tree.root() {
            Some(root) => Ok(Some(root)),
            None => Err(LifecycleError::NotCreated(self.root_path()).into()),
        }
    }

    fn root_path(&self) -> TagPath {
        TagPath::root(self.args.tag.clone())
    }

    fn report(&mut self, error: &PmError) {
        (self.error_handler)(error);
    }
}
