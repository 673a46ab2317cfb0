//! Arena-backed presentation model tree
//!
//! Nodes live in slots addressed by [`PmId`]. A node refers to its parent by id
//! only; ownership flows strictly from the tree to its slots, so there are no
//! reference cycles between parents and children. Slots carry a generation
//! counter, and an id whose node was destroyed never resolves again, even after
//! the slot is reused.

use crate::error::{LifecycleError, PersistError, PmError};
use crate::lifecycle::{LifecycleEvent, PmLifecycle, PmLifecycleState};
use crate::message::{PmMessage, PmMessageHandler};
use crate::pm::context::PmContext;
use crate::pm::description::{PmArgs, PmDescription, PmFactory};
use crate::pm::model::PresentationModel;
use crate::pm::scope::PmScope;
use crate::state::factory::StateSaverFactory;
use crate::state::snapshot::{PmSnapshot, TagPath};
use std::fmt;
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Handle to a node of a [`PmTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PmId {
    index: u32,
    generation: u32,
}

impl fmt::Display for PmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

pub(crate) struct Node<D: PmDescription> {
    tag: String,
    path: TagPath,
    parent: Option<PmId>,
    description: D,
    lifecycle: PmLifecycle,
    children: Vec<PmId>,
    /// `None` while the model is lent out to one of its own hooks or handlers
    model: Option<Box<dyn PresentationModel<D>>>,
    messages: PmMessageHandler<D>,
    scope: PmScope,
    foreground_scope: PmScope,
    /// Destroy requested while the model was lent out; runs once it is back
    pending_destroy: bool,
}

impl<D: PmDescription> Node<D> {
    fn new(
        path: TagPath,
        parent: Option<PmId>,
        description: D,
        model: Box<dyn PresentationModel<D>>,
    ) -> Self {
        Self {
            tag: path.tag().to_string(),
            path,
            parent,
            description,
            lifecycle: PmLifecycle::new(),
            children: Vec::new(),
            model: Some(model),
            messages: PmMessageHandler::new(),
            scope: PmScope::new(),
            foreground_scope: PmScope::new(),
            pending_destroy: false,
        }
    }
}

struct Slot<D: PmDescription> {
    generation: u32,
    node: Option<Node<D>>,
}

/// The tree of presentation models owned by one host.
///
/// All operations are synchronous and expect a single writer; the tree is
/// neither `Send` nor `Sync`.
pub struct PmTree<D: PmDescription> {
    factory: Box<dyn PmFactory<D>>,
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    root: Option<PmId>,
    len: usize,
}

impl<D: PmDescription> fmt::Debug for PmTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PmTree")
            .field("root", &self.root)
            .field("len", &self.len)
            .finish()
    }
}

impl<D: PmDescription> PmTree<D> {
    pub fn new(factory: impl PmFactory<D> + 'static) -> Self {
        Self::with_factory(Box::new(factory))
    }

    pub fn with_factory(factory: Box<dyn PmFactory<D>>) -> Self {
        Self {
            factory,
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }

    pub(crate) fn node(&self, id: PmId) -> Option<&Node<D>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: PmId) -> Option<&mut Node<D>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn insert(&mut self, node: Node<D>) -> PmId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return PmId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        PmId {
            index,
            generation: 0,
        }
    }

    fn remove(&mut self, id: PmId) -> Option<Node<D>> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    // ----- read access -----

    pub fn root(&self) -> Option<PmId> {
        self.root
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: PmId) -> bool {
        self.node(id).is_some()
    }

    pub fn tag(&self, id: PmId) -> Option<&str> {
        self.node(id).map(|node| node.tag.as_str())
    }

    pub fn path(&self, id: PmId) -> Option<&TagPath> {
        self.node(id).map(|node| &node.path)
    }

    pub fn description(&self, id: PmId) -> Option<&D> {
        self.node(id).map(|node| &node.description)
    }

    pub fn parent(&self, id: PmId) -> Option<PmId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Children in creation order. Empty for unknown ids.
    pub fn children(&self, id: PmId) -> &[PmId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn child(&self, id: PmId, tag: &str) -> Option<PmId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.tag(*child) == Some(tag))
    }

    pub fn lifecycle_state(&self, id: PmId) -> Option<PmLifecycleState> {
        self.node(id).map(|node| node.lifecycle.state())
    }

    pub fn lifecycle_updates(&self, id: PmId) -> Option<watch::Receiver<PmLifecycleState>> {
        self.node(id).map(|node| node.lifecycle.subscribe())
    }

    /// Look a node up by its tag path from the root
    pub fn find(&self, path: &TagPath) -> Option<PmId> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.filter(|root| self.tag(*root) == Some(first.as_str()))?;
        for tag in rest {
            current = self.child(current, tag)?;
        }
        Some(current)
    }

    /// Pre-order traversal from the root
    pub fn walk(&self) -> Vec<PmId> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<PmId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Typed view of a node's model. `None` for unknown ids, a different model
    /// type, or a model currently running one of its own hooks.
    pub fn model<P: PresentationModel<D>>(&self, id: PmId) -> Option<&P> {
        let model: &dyn PresentationModel<D> = self.node(id)?.model.as_deref()?;
        model.as_any().downcast_ref::<P>()
    }

    pub fn model_mut<P: PresentationModel<D>>(&mut self, id: PmId) -> Option<&mut P> {
        let model: &mut dyn PresentationModel<D> = self.node_mut(id)?.model.as_deref_mut()?;
        model.as_any_mut().downcast_mut::<P>()
    }

    fn children_of(&self, id: PmId) -> Vec<PmId> {
        self.children(id).to_vec()
    }

    // ----- construction -----

    /// Construct the root from `args`. The root starts `Initialized`.
    pub fn set_root(&mut self, args: &PmArgs<D>) -> Result<PmId, PmError> {
        if let Some(path) = self.root.and_then(|root| self.path(root)) {
            return Err(LifecycleError::AlreadyCreated(path.clone()).into());
        }
        let model = self.factory.create(&args.description);
        let id = self.insert(Node::new(
            TagPath::root(args.tag.clone()),
            None,
            args.description.clone(),
            model,
        ));
        self.root = Some(id);
        debug!(tag = %args.tag, "Root presentation model constructed");
        Ok(id)
    }

    /// Reconstruct the whole tree from a snapshot, depth-first. Every node is
    /// built by the factory and receives its saved state through `restore`
    /// before any lifecycle hook runs.
    pub fn rebuild(&mut self, snapshot: &PmSnapshot<D>) -> Result<PmId, PersistError> {
        if let Some(path) = self.root.and_then(|root| self.path(root)) {
            return Err(PersistError::Decode(format!(
                "cannot rebuild over existing tree rooted at {}",
                path
            )));
        }
        let id = self.restore_node(snapshot, TagPath::root(snapshot.tag.clone()), None)?;
        self.root = Some(id);
        debug!(nodes = self.len, "Presentation model tree rebuilt from snapshot");
        Ok(id)
    }

    fn restore_node(
        &mut self,
        snapshot: &PmSnapshot<D>,
        path: TagPath,
        parent: Option<PmId>,
    ) -> Result<PmId, PersistError> {
        if let Some(parent) = parent {
            if self.child(parent, &snapshot.tag).is_some() {
                return Err(PersistError::Decode(format!("duplicate child tag at {}", path)));
            }
        }

        let mut model = self.factory.create(&snapshot.description);
        model
            .restore(&snapshot.state)
            .map_err(|source| PersistError::State {
                path: path.clone(),
                source,
            })?;

        let id = self.insert(Node::new(
            path.clone(),
            parent,
            snapshot.description.clone(),
            model,
        ));
        if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.push(id);
        }
        trace!(path = %path, "Restored presentation model");

        for child in &snapshot.children {
            self.restore_node(child, path.child(child.tag.clone()), Some(id))?;
        }
        Ok(id)
    }

    /// Drop every node without running hooks. Only meant for trees that were
    /// never created, such as a partially rebuilt one.
    pub(crate) fn clear(&mut self) {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.root = None;
        self.len = 0;
    }

    // ----- structure -----

    /// Attach a child under `parent`.
    ///
    /// An existing child with the same tag and description is returned as is;
    /// this is how children rebuilt from a snapshot are picked up again. A new
    /// child is driven towards the parent's current lifecycle state before
    /// returning. Under an `InBackground` parent it stays `Created`, since a
    /// node that was never in the foreground has nothing to send to the
    /// background. Returns `Ok(None)` when `parent` is gone or destroyed.
    pub fn attach_child(
        &mut self,
        parent: PmId,
        description: D,
        tag: impl Into<String>,
    ) -> Result<Option<PmId>, PmError> {
        let tag = tag.into();
        let (parent_path, parent_state) = match self.node(parent) {
            Some(node) if node.lifecycle.state() != PmLifecycleState::Destroyed => {
                (node.path.clone(), node.lifecycle.state())
            }
            _ => {
                debug!(tag = %tag, "Attach ignored, parent is gone");
                return Ok(None);
            }
        };

        if let Some(existing) = self.child(parent, &tag) {
            if self.description(existing) == Some(&description) {
                trace!(path = %parent_path.child(tag.as_str()), "Reusing existing child");
                return Ok(Some(existing));
            }
            return Err(PmError::DuplicateTag {
                parent: parent_path,
                tag,
            });
        }

        let path = parent_path.child(tag);
        let model = self.factory.create(&description);
        let id = self.insert(Node::new(path.clone(), Some(parent), description, model));
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        debug!(path = %path, state = %parent_state, "Presentation model attached");

        self.drive_to(id, parent_state)?;
        Ok(Some(id))
    }

    /// Destroy and remove the child tagged `tag`. `Ok(false)` when there is none.
    pub fn detach_child(&mut self, parent: PmId, tag: &str) -> Result<bool, PmError> {
        match self.child(parent, tag) {
            Some(child) => {
                self.destroy(child)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ----- lifecycle -----

    /// Run `on_create` on `id` and then on its subtree, top-down
    pub fn create(&mut self, id: PmId) -> Result<(), PmError> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if node.lifecycle.state() != PmLifecycleState::Initialized {
            return Err(LifecycleError::AlreadyCreated(node.path.clone()).into());
        }
        self.drive_to(id, PmLifecycleState::Created)
    }

    /// Bring `id` to the foreground, then its children in creation order
    pub fn foreground(&mut self, id: PmId) -> Result<(), PmError> {
        self.require_created(id)?;
        self.drive_to(id, PmLifecycleState::InForeground)
    }

    /// Send the children of `id` to the background, then `id` itself
    pub fn background(&mut self, id: PmId) -> Result<(), PmError> {
        self.require_created(id)?;
        self.drive_to(id, PmLifecycleState::InBackground)
    }

    /// Destroy `id` and its subtree, children first, and release it.
    ///
    /// Keeps going when a hook fails so every node gets released; the first
    /// failure is returned. A node whose model is running one of its own hooks
    /// or handlers is unlinked right away and finishes its teardown as soon as
    /// the model is handed back.
    pub fn destroy(&mut self, id: PmId) -> Result<(), PmError> {
        if !self.contains(id) {
            return Ok(());
        }
        let mut first_error: Option<PmError> = None;

        for child in self.children_of(id) {
            keep_first(&mut first_error, self.destroy(child));
        }

        if self.defer_destroy(id) {
            return first_error.map_or(Ok(()), Err);
        }

        if self.lifecycle_state(id) == Some(PmLifecycleState::InForeground) {
            keep_first(&mut first_error, self.transition(id, LifecycleEvent::Background));
        }
        // Children attached by `on_background` above
        for child in self.children_of(id) {
            keep_first(&mut first_error, self.destroy(child));
        }
        keep_first(&mut first_error, self.transition(id, LifecycleEvent::Destroy));

        if let Some(mut node) = self.remove(id) {
            let cancelled = node.scope.close() + node.foreground_scope.close();
            self.unlink(id, node.parent);
            debug!(path = %node.path, cancelled_tasks = cancelled, "Presentation model destroyed");
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Mark `id` for destruction when its model is lent out. The node leaves
    /// its parent immediately so its tag can be reused.
    fn defer_destroy(&mut self, id: PmId) -> bool {
        let Some(node) = self.node_mut(id).filter(|node| node.model.is_none()) else {
            return false;
        };
        node.pending_destroy = true;
        let parent = node.parent;
        debug!(path = %node.path, "Model busy, destroy deferred until it is handed back");
        self.unlink(id, parent);
        true
    }

    fn unlink(&mut self, id: PmId, parent: Option<PmId>) {
        if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    fn require_created(&self, id: PmId) -> Result<(), PmError> {
        match self.node(id) {
            Some(node) if node.lifecycle.state() == PmLifecycleState::Initialized => {
                Err(LifecycleError::NotCreated(node.path.clone()).into())
            }
            _ => Ok(()),
        }
    }

    /// Move `id` and its subtree towards `target`, skipping steps already taken.
    ///
    /// A failing hook does not stop its siblings; the first failure is
    /// returned. Going down, a node whose own hook failed keeps its subtree
    /// where it was. Going to the background, a node moves even when one of
    /// its children failed.
    fn drive_to(&mut self, id: PmId, target: PmLifecycleState) -> Result<(), PmError> {
        let Some(state) = self.lifecycle_state(id) else {
            return Ok(());
        };
        if state == PmLifecycleState::Destroyed {
            return Ok(());
        }

        let mut first_error: Option<PmError> = None;
        match target {
            PmLifecycleState::Initialized => {}
            PmLifecycleState::Created | PmLifecycleState::InForeground => {
                if state == PmLifecycleState::Initialized {
                    self.transition(id, LifecycleEvent::Create)?;
                }
                if target == PmLifecycleState::InForeground {
                    self.transition(id, LifecycleEvent::Foreground)?;
                }
                for child in self.children_of(id) {
                    keep_first(&mut first_error, self.drive_to(child, target));
                }
            }
            PmLifecycleState::InBackground => {
                if state == PmLifecycleState::Initialized {
                    self.drive_to(id, PmLifecycleState::Created)?;
                }
                for child in self.children_of(id) {
                    let result = self.drive_to(child, PmLifecycleState::InBackground);
                    keep_first(&mut first_error, result);
                }
                keep_first(&mut first_error, self.transition(id, LifecycleEvent::Background));
            }
            PmLifecycleState::Destroyed => keep_first(&mut first_error, self.destroy(id)),
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Apply one event to one node and fire its hook if the state changed
    fn transition(&mut self, id: PmId, event: LifecycleEvent) -> Result<bool, PmError> {
        let Some(node) = self.node_mut(id) else {
            return Ok(false);
        };
        if node.model.is_none() {
            return Err(LifecycleError::Busy(node.path.clone()).into());
        }
        let previous = node.lifecycle.state();
        if !node.lifecycle.apply(event, &node.path)? {
            return Ok(false);
        }
        if event == LifecycleEvent::Background {
            node.foreground_scope.cancel();
        }
        let path = node.path.clone();
        trace!(path = %path, from = %previous, to = %node.lifecycle.state(), "Lifecycle transition");

        if event == LifecycleEvent::Destroy && previous == PmLifecycleState::Initialized {
            return Ok(true);
        }

        let result = self.with_model(id, |model, cx| match event {
            LifecycleEvent::Create => model.on_create(cx),
            LifecycleEvent::Foreground => model.on_foreground(cx),
            LifecycleEvent::Background => model.on_background(cx),
            LifecycleEvent::Destroy => model.on_destroy(cx),
        });

        match result {
            Some(Err(source)) => Err(hook_error(path, event.hook_name(), source)),
            Some(Ok(())) => Ok(true),
            None => Err(LifecycleError::Busy(path).into()),
        }
    }

    /// Lend the model of `id` to `f` together with a context for the rest of
    /// the tree. `None` when the node is gone or its model is already lent out.
    pub(crate) fn with_model<R>(
        &mut self,
        id: PmId,
        f: impl FnOnce(&mut dyn PresentationModel<D>, &mut PmContext<'_, D>) -> R,
    ) -> Option<R> {
        let node = self.node_mut(id)?;
        let mut model = node.model.take()?;
        let path = node.path.clone();

        let result = {
            let mut cx = PmContext::new(self, id, path);
            f(&mut *model, &mut cx)
        };

        let pending_destroy = match self.node_mut(id) {
            Some(node) => {
                node.model = Some(model);
                node.pending_destroy
            }
            None => {
                trace!(id = %id, "Node released while its model was lent out");
                false
            }
        };
        if pending_destroy {
            if let Err(e) = self.destroy(id) {
                warn!(id = %id, error = %e, "Deferred destroy failed");
            }
        }
        Some(result)
    }

    // ----- messages -----

    /// Dispatch `message` to the handlers of `id`, bubbling to the parent while
    /// unhandled. Returns `false` when nobody up to the root claimed it.
    pub fn handle_message(&mut self, id: PmId, message: &dyn PmMessage) -> bool {
        let mut current = Some(id);
        while let Some(target) = current {
            let Some(node) = self.node(target) else {
                return false;
            };
            let parent = node.parent;

            if self.dispatch_local(target, message) {
                trace!(id = %target, message = ?message, "Message handled");
                return true;
            }

            let bubbles = self
                .node(target)
                .and_then(|node| node.model.as_deref())
                .map_or(true, |model| model.bubbles_messages());
            if !bubbles {
                return false;
            }
            current = parent;
        }
        debug!(message = ?message, "Message not handled");
        false
    }

    fn dispatch_local(&mut self, id: PmId, message: &dyn PmMessage) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if node.model.is_none() {
            debug!(path = %node.path, "Model busy, local message handlers skipped");
            return false;
        }
        if !node.messages.handles(message) {
            return false;
        }

        let mut handlers = std::mem::take(&mut node.messages);
        let handled = self
            .with_model(id, |model, cx| handlers.dispatch(model, cx, message))
            .unwrap_or(false);

        // Keep handlers registered while the table was taken out
        if let Some(node) = self.node_mut(id) {
            let added = std::mem::replace(&mut node.messages, handlers);
            node.messages.merge(added);
        }
        handled
    }

    pub(crate) fn message_handler_mut(&mut self, id: PmId) -> Option<&mut PmMessageHandler<D>> {
        self.node_mut(id).map(|node| &mut node.messages)
    }

    /// System back for the subtree rooted at `id`
    pub fn handle_back(&mut self, id: PmId) -> bool {
        let handled = self
            .with_model(id, |model, cx| model.handle_back(cx))
            .unwrap_or(false);
        trace!(id = %id, handled, "Back handled");
        handled
    }

    // ----- async work -----

    pub(crate) fn launch<F>(
        &mut self,
        id: PmId,
        foreground_only: bool,
        future: F,
    ) -> Result<bool, PmError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(node) = self.node_mut(id) else {
            return Ok(false);
        };
        let result = if foreground_only {
            if node.lifecycle.state() != PmLifecycleState::InForeground {
                return Ok(false);
            }
            node.foreground_scope.launch(future)
        } else {
            node.scope.launch(future)
        };
        result.map_err(|_| PmError::NoRuntime(node.path.clone()))
    }

    /// Tasks still running for `id`, both scopes combined
    pub fn active_tasks(&self, id: PmId) -> usize {
        self.node(id).map_or(0, |node| {
            node.scope.active_tasks() + node.foreground_scope.active_tasks()
        })
    }

    // ----- save -----

    /// Write every node, pre-order, into the saver `factory` creates for its path.
    /// Returns the number of nodes saved.
    pub fn save_into(&self, factory: &mut dyn StateSaverFactory<D>) -> Result<usize, PersistError> {
        factory.reset();
        let mut saved = 0;
        for id in self.walk() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let saver = factory.create_saver(&node.path, &node.description);
            match node.model.as_deref() {
                Some(model) => {
                    model.save(saver).map_err(|source| PersistError::State {
                        path: node.path.clone(),
                        source,
                    })?;
                    saved += 1;
                }
                None => warn!(path = %node.path, "Model busy, state not saved"),
            }
        }
        Ok(saved)
    }
}

fn keep_first<T>(first: &mut Option<PmError>, result: Result<T, PmError>) {
    if let Err(e) = result {
        first.get_or_insert(e);
    }
}

/// Errors raised by the tree itself pass through hooks unchanged
fn hook_error(path: TagPath, hook: &'static str, source: anyhow::Error) -> PmError {
    match source.downcast::<PmError>() {
        Ok(inner) => inner,
        Err(source) => PmError::Hook { path, hook, source },
    }
}
