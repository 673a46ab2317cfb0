//! Presentation model lifecycle state machine
//!
//! ```text
//! Initialized -> Created -> InForeground <-> InBackground -> Destroyed
//! ```
//!
//! `Initialized` is the state of a node that sits in the tree (freshly attached or
//! rebuilt from a snapshot) but has not received `on_create` yet. Every state can
//! move to `Destroyed`.

use crate::error::LifecycleError;
use crate::state::snapshot::TagPath;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmLifecycleState {
    Initialized,
    Created,
    InForeground,
    InBackground,
    Destroyed,
}

impl PmLifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            PmLifecycleState::Initialized => "initialized",
            PmLifecycleState::Created => "created",
            PmLifecycleState::InForeground => "in_foreground",
            PmLifecycleState::InBackground => "in_background",
            PmLifecycleState::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for PmLifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Create,
    Foreground,
    Background,
    Destroy,
}

impl LifecycleEvent {
    /// Name of the hook fired for this event
    pub fn hook_name(self) -> &'static str {
        match self {
            LifecycleEvent::Create => "on_create",
            LifecycleEvent::Foreground => "on_foreground",
            LifecycleEvent::Background => "on_background",
            LifecycleEvent::Destroy => "on_destroy",
        }
    }
}

/// Lifecycle of a single presentation model.
///
/// Owned by the node's tree slot and only mutated by the tree while it drives
/// transitions. Changes are published on a watch channel so async work launched
/// by the node can follow them.
#[derive(Debug)]
pub struct PmLifecycle {
    state: PmLifecycleState,
    updates: watch::Sender<PmLifecycleState>,
}

impl Default for PmLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PmLifecycle {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(PmLifecycleState::Initialized);
        Self {
            state: PmLifecycleState::Initialized,
            updates,
        }
    }

    pub fn state(&self) -> PmLifecycleState {
        self.state
    }

    /// Receiver that observes every subsequent state change
    pub fn subscribe(&self) -> watch::Receiver<PmLifecycleState> {
        self.updates.subscribe()
    }

    /// Apply `event`, returning whether the state changed.
    ///
    /// Repeated foreground/background requests and anything after destruction
    /// are no-ops. `Create` is accepted exactly once, from `Initialized`.
    pub fn apply(&mut self, event: LifecycleEvent, path: &TagPath) -> Result<bool, LifecycleError> {
        use PmLifecycleState::{Created, Destroyed, InBackground, InForeground, Initialized};

        let next = match (event, self.state) {
            (LifecycleEvent::Create, Initialized) => Created,
            (LifecycleEvent::Create, _) => {
                return Err(LifecycleError::AlreadyCreated(path.clone()));
            }

            (LifecycleEvent::Foreground | LifecycleEvent::Background, Initialized) => {
                return Err(LifecycleError::NotCreated(path.clone()));
            }
            (LifecycleEvent::Foreground, Created | InBackground) => InForeground,
            (LifecycleEvent::Foreground, InForeground | Destroyed) => return Ok(false),
            (LifecycleEvent::Background, InForeground) => InBackground,
            (LifecycleEvent::Background, Created | InBackground | Destroyed) => return Ok(false),

            (LifecycleEvent::Destroy, Destroyed) => return Ok(false),
            (LifecycleEvent::Destroy, _) => Destroyed,
        };

        self.state = next;
        self.updates.send_replace(next);
        Ok(true)
    }
}
