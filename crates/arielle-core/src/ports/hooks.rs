//! Optional lifecycle callbacks.

use std::fmt;
use std::sync::Arc;

use crate::task::DownloadTask;

/// Called when a task is registered.
pub type StartHook = Arc<dyn Fn(&DownloadTask) + Send + Sync>;

/// Called once when a task reaches `done`.
pub type CompleteHook = Arc<dyn Fn(&DownloadTask) + Send + Sync>;

/// Hooks invoked by the coordinator outside of any lock.
#[derive(Clone, Default)]
pub struct TaskHooks {
    /// Fired when a task is registered.
    pub on_start: Option<StartHook>,
    /// Fired once when a task reaches `done`.
    pub on_complete: Option<CompleteHook>,
}

impl TaskHooks {
    /// Create empty hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start hook.
    #[must_use]
    pub fn on_start(mut self, hook: impl Fn(&DownloadTask) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Set the completion hook.
    #[must_use]
    pub fn on_complete(mut self, hook: impl Fn(&DownloadTask) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Invoke the start hook, if set.
    pub fn fire_start(&self, task: &DownloadTask) {
        if let Some(hook) = &self.on_start {
            hook(task);
        }
    }

    /// Invoke the completion hook, if set.
    pub fn fire_complete(&self, task: &DownloadTask) {
        if let Some(hook) = &self.on_complete {
            hook(task);
        }
    }
}

impl fmt::Debug for TaskHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}
