//! Task event emitter port.
//!
//! Lets renderers observe registry changes without coupling the coordinator
//! to a transport (terminal UI, IPC, SSE).

use serde::{Deserialize, Serialize};

use crate::task::{DownloadTask, TaskId};

/// A change to the task registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// A task was created or changed; carries the new snapshot.
    Updated {
        /// The task after the change.
        task: DownloadTask,
    },
    /// A task was removed from the registry.
    Removed {
        /// Id of the removed task.
        id: TaskId,
    },
}

impl TaskEvent {
    /// Id of the task the event refers to.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Updated { task } => &task.id,
            Self::Removed { id } => id,
        }
    }
}

/// Port for emitting task events.
///
/// `emit` is called while registry state is already committed and must not
/// block.
pub trait TaskEventEmitterPort: Send + Sync {
    /// Emit a task event.
    fn emit(&self, event: TaskEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn TaskEventEmitterPort>;
}

/// A no-op emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopTaskEmitter;

impl NoopTaskEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TaskEventEmitterPort for NoopTaskEmitter {
    fn emit(&self, _event: TaskEvent) {}

    fn clone_box(&self) -> Box<dyn TaskEventEmitterPort> {
        Box::new(self.clone())
    }
}
