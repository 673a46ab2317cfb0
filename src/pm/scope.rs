//! Lifecycle-bound async work

use std::future::Future;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;

/// Set of tasks that share a cancellation boundary.
///
/// Every node owns two scopes: one closed when the node is destroyed and one
/// cancelled each time the node leaves the foreground. Cancellation aborts the
/// tasks; nothing launched into a scope outlives it.
#[derive(Debug, Default)]
pub struct PmScope {
    tasks: Vec<JoinHandle<()>>,
    closed: bool,
}

impl PmScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` on the current tokio runtime.
    ///
    /// Returns `Ok(false)` without spawning when the scope is already closed.
    pub(crate) fn launch<F>(&mut self, future: F) -> Result<bool, TryCurrentError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed {
            return Ok(false);
        }
        let handle = Handle::try_current()?;
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle.spawn(future));
        Ok(true)
    }

    /// Abort every running task. The scope stays usable.
    pub fn cancel(&mut self) -> usize {
        let count = self.tasks.len();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        count
    }

    /// Abort every running task and refuse new ones
    pub fn close(&mut self) -> usize {
        self.closed = true;
        self.cancel()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tasks launched and not yet finished
    pub fn active_tasks(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Drop for PmScope {
    fn drop(&mut self) {
        self.cancel();
    }
}
