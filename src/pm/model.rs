//! The presentation model trait

use crate::error::StateError;
use crate::pm::context::PmContext;
use crate::pm::description::PmDescription;
use crate::pm::tree::PmId;
use crate::state::saver::StateSaver;
use std::any::Any;

/// Downcasting support for trait objects
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node of UI state and behavior, independent of rendering.
///
/// Every method has a default, so a model only implements what it needs.
/// Lifecycle hooks run after the node's state has changed and receive a
/// [`PmContext`] for touching the rest of the tree: attaching children,
/// registering message handlers, launching lifecycle-bound work.
///
/// `save` and `restore` persist the model's own fields. `restore` runs on a
/// freshly constructed model before `on_create`.
pub trait PresentationModel<D: PmDescription>: AsAny {
    fn on_create(&mut self, _cx: &mut PmContext<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_foreground(&mut self, _cx: &mut PmContext<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_background(&mut self, _cx: &mut PmContext<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_destroy(&mut self, _cx: &mut PmContext<'_, D>) -> anyhow::Result<()> {
        Ok(())
    }

    fn save(&self, _saver: &mut dyn StateSaver) -> Result<(), StateError> {
        Ok(())
    }

    fn restore(&mut self, _saver: &dyn StateSaver) -> Result<(), StateError> {
        Ok(())
    }

    /// The child currently shown to the user, if this node is a navigation
    /// container. Drives the default [`handle_back`](Self::handle_back).
    fn active_child(&self, _cx: &PmContext<'_, D>) -> Option<PmId> {
        None
    }

    /// System back. Returns `true` when the action was consumed; `false` lets
    /// the host run its default (for example closing the window).
    fn handle_back(&mut self, cx: &mut PmContext<'_, D>) -> bool {
        match self.active_child(cx) {
            Some(child) => cx.handle_back_of(child),
            None => false,
        }
    }

    /// Whether messages no local handler claimed continue to the parent
    fn bubbles_messages(&self) -> bool {
        true
    }
}
