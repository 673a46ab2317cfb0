//! Context handed to hooks and message handlers

use crate::error::PmError;
use crate::lifecycle::PmLifecycleState;
use crate::message::{BackMessage, PmMessage};
use crate::pm::description::PmDescription;
use crate::pm::model::PresentationModel;
use crate::pm::tree::{PmId, PmTree};
use crate::state::snapshot::TagPath;
use std::future::Future;
use tokio::sync::watch;

/// A presentation model's window onto its tree while one of its hooks or
/// message handlers runs.
pub struct PmContext<'a, D: PmDescription> {
    tree: &'a mut PmTree<D>,
    id: PmId,
    path: TagPath,
}

impl<'a, D: PmDescription> PmContext<'a, D> {
    pub(crate) fn new(tree: &'a mut PmTree<D>, id: PmId, path: TagPath) -> Self {
        Self { tree, id, path }
    }

    pub fn id(&self) -> PmId {
        self.id
    }

    pub fn tag(&self) -> &str {
        self.path.tag()
    }

    pub fn path(&self) -> &TagPath {
        &self.path
    }

    pub fn description(&self) -> Option<&D> {
        self.tree.description(self.id)
    }

    pub fn parent(&self) -> Option<PmId> {
        self.tree.parent(self.id)
    }

    pub fn lifecycle_state(&self) -> PmLifecycleState {
        self.tree
            .lifecycle_state(self.id)
            .unwrap_or(PmLifecycleState::Destroyed)
    }

    pub fn lifecycle_updates(&self) -> Option<watch::Receiver<PmLifecycleState>> {
        self.tree.lifecycle_updates(self.id)
    }

    pub fn children(&self) -> &[PmId] {
        self.tree.children(self.id)
    }

    pub fn child(&self, tag: &str) -> Option<PmId> {
        self.tree.child(self.id, tag)
    }

    pub fn tree(&self) -> &PmTree<D> {
        &*self.tree
    }

    /// Typed access to another node's model, usually a child's
    pub fn model_mut<P: PresentationModel<D>>(&mut self, id: PmId) -> Option<&mut P> {
        self.tree.model_mut(id)
    }

    /// See [`PmTree::attach_child`]
    pub fn attach_child(
        &mut self,
        description: D,
        tag: impl Into<String>,
    ) -> Result<Option<PmId>, PmError> {
        self.tree.attach_child(self.id, description, tag)
    }

    pub fn detach_child(&mut self, tag: &str) -> Result<bool, PmError> {
        self.tree.detach_child(self.id, tag)
    }

    /// Register a handler on this node for messages of type `M`.
    ///
    /// `P` must be this node's model type; handlers registered with another
    /// type never match.
    pub fn on_message<P, M>(
        &mut self,
        handler: impl FnMut(&mut P, &mut PmContext<'_, D>, &M) -> bool + 'static,
    ) where
        P: PresentationModel<D>,
        M: PmMessage,
    {
        if let Some(messages) = self.tree.message_handler_mut(self.id) {
            messages.register::<P, M, _>(handler);
        }
    }

    /// Send `message` up the tree, starting at the parent
    pub fn send_to_parent<M: PmMessage>(&mut self, message: M) -> bool {
        match self.parent() {
            Some(parent) => self.tree.handle_message(parent, &message),
            None => false,
        }
    }

    /// Ask the parent container to navigate back from this node
    pub fn back(&mut self) -> bool {
        self.send_to_parent(BackMessage)
    }

    /// Run back handling for `child`, typically the active child of a container
    pub fn handle_back_of(&mut self, child: PmId) -> bool {
        self.tree.handle_back(child)
    }

    /// Launch `future` until this node is destroyed.
    ///
    /// `Ok(false)` when the node is already being torn down.
    pub fn launch<F>(&mut self, future: F) -> Result<bool, PmError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tree.launch(self.id, false, future)
    }

    /// Launch `future` until this node leaves the foreground.
    ///
    /// `Ok(false)` when the node is not in the foreground.
    pub fn launch_in_foreground<F>(&mut self, future: F) -> Result<bool, PmError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tree.launch(self.id, true, future)
    }
}
