//! Messages between presentation models
//!
//! A message is any `'static + Debug` value. Handlers are registered per node
//! and per message type; a message nobody claims bubbles from child to parent
//! until the root.

use crate::pm::context::PmContext;
use crate::pm::description::PmDescription;
use crate::pm::model::{AsAny, PresentationModel};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug};

pub trait PmMessage: AsAny + Debug {}

impl<T: Any + Debug> PmMessage for T {}

/// Sent by a child to ask its container to navigate back from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackMessage;

type ErasedHandler<D> =
    Box<dyn FnMut(&mut dyn PresentationModel<D>, &mut PmContext<'_, D>, &dyn Any) -> bool>;

/// Per-node dispatch table keyed by message type
pub struct PmMessageHandler<D: PmDescription> {
    handlers: HashMap<TypeId, Vec<ErasedHandler<D>>>,
}

impl<D: PmDescription> Default for PmMessageHandler<D> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<D: PmDescription> Debug for PmMessageHandler<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PmMessageHandler")
            .field("handlers", &self.len())
            .finish()
    }
}

impl<D: PmDescription> PmMessageHandler<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P, M, F>(&mut self, mut handler: F)
    where
        P: PresentationModel<D>,
        M: PmMessage,
        F: FnMut(&mut P, &mut PmContext<'_, D>, &M) -> bool + 'static,
    {
        let erased: ErasedHandler<D> = Box::new(
            move |model: &mut dyn PresentationModel<D>,
                  cx: &mut PmContext<'_, D>,
                  message: &dyn Any| {
                match (
                    model.as_any_mut().downcast_mut::<P>(),
                    message.downcast_ref::<M>(),
                ) {
                    (Some(model), Some(message)) => handler(model, cx, message),
                    _ => false,
                }
            },
        );
        self.handlers
            .entry(TypeId::of::<M>())
            .or_default()
            .push(erased);
    }

    /// Whether any handler is registered for the runtime type of `message`
    pub fn handles(&self, message: &dyn PmMessage) -> bool {
        self.handlers
            .get(&Any::type_id(message.as_any()))
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Total number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the handlers for `message` in registration order until one claims it
    pub(crate) fn dispatch(
        &mut self,
        model: &mut dyn PresentationModel<D>,
        cx: &mut PmContext<'_, D>,
        message: &dyn PmMessage,
    ) -> bool {
        let message = message.as_any();
        match self.handlers.get_mut(&Any::type_id(message)) {
            Some(handlers) => handlers
                .iter_mut()
                .any(|handler| handler(&mut *model, &mut *cx, message)),
            None => false,
        }
    }

    /// Append the handlers of `other`, keeping registration order
    pub(crate) fn merge(&mut self, other: Self) {
        for (type_id, handlers) in other.handlers {
            self.handlers.entry(type_id).or_default().extend(handlers);
        }
    }
}
