//! Insertion-ordered task registry.

use indexmap::IndexMap;

use super::types::{DownloadTask, TaskId};
use crate::errors::{DownloadError, DownloadResult};
use crate::push::PushEvent;
use crate::reconcile::{Reconciled, reconcile};

/// Keyed collection of tasks, iterated in creation order.
///
/// At most one task exists per id. A non-terminal task blocks re-registration
/// of its id; a terminal one is replaced in place.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: IndexMap<TaskId, DownloadTask>,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh `pending` task.
    pub fn register(
        &mut self,
        id: TaskId,
        display_name: impl Into<String>,
    ) -> DownloadResult<&DownloadTask> {
        if self.tasks.get(&id).is_some_and(|t| t.status.is_active()) {
            return Err(DownloadError::already_active(id.as_str()));
        }
        let task = DownloadTask::pending(id.clone(), display_name);
        let (index, _) = self.tasks.insert_full(id, task);
        Ok(&self.tasks[index])
    }

    /// Mutate a task in place and return the new snapshot.
    ///
    /// A missing id is a no-op.
    pub fn update<F>(&mut self, id: &TaskId, mutate: F) -> Option<DownloadTask>
    where
        F: FnOnce(&mut DownloadTask),
    {
        let task = self.tasks.get_mut(id)?;
        mutate(task);
        Some(task.clone())
    }

    /// Store a snapshot produced elsewhere (e.g. by the reconciler).
    ///
    /// New ids are appended.
    pub fn put(&mut self, task: DownloadTask) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// Remove a task, preserving the order of the rest.
    pub fn remove(&mut self, id: &TaskId) -> Option<DownloadTask> {
        self.tasks.shift_remove(id)
    }

    /// Look up a task.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&DownloadTask> {
        self.tasks.get(id)
    }

    /// Whether an id is registered.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Ordered copy of every task.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DownloadTask> {
        self.tasks.values().cloned().collect()
    }

    /// Iterate tasks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &DownloadTask> {
        self.tasks.values()
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Fold one push event into the registry.
    #[must_use]
    pub fn reduce(mut self, event: &PushEvent) -> (Self, Reconciled) {
        let outcome = self.apply(event);
        (self, outcome)
    }

    /// In-place form of [`TaskRegistry::reduce`].
    pub fn apply(&mut self, event: &PushEvent) -> Reconciled {
        let outcome = reconcile(self.tasks.get(event.task_id()), event);
        if let Some(task) = outcome.task() {
            self.put(task.clone());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{CompleteEvent, ProgressEvent};
    use crate::task::{ErrorCode, TaskStatus};

    #[test]
    fn test_register_rejects_active_duplicate() {
        let mut registry = TaskRegistry::new();
        registry.register("m1".into(), "Model").unwrap();

        let err = registry.register("m1".into(), "Model").unwrap_err();
        assert_eq!(err, DownloadError::already_active("m1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces_terminal_in_place() {
        let mut registry = TaskRegistry::new();
        registry.register("a".into(), "A").unwrap();
        registry.register("b".into(), "B").unwrap();
        registry.update(&"a".into(), |t| t.fail(ErrorCode::Network));

        let task = registry.register("a".into(), "A again").unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.error_code.is_none());

        let order: Vec<_> = registry.iter().map(|t| t.id.as_str().to_string()).collect();
        assert_eq!(order, ["a", "b"]);
        assert_eq!(registry.get(&"a".into()).unwrap().display_name, "A again");
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut registry = TaskRegistry::new();
        let result = registry.update(&"ghost".into(), |t| t.progress = 50);
        assert!(result.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut registry = TaskRegistry::new();
        for id in ["a", "b", "c"] {
            registry.register(id.into(), id).unwrap();
        }
        assert!(registry.remove(&"b".into()).is_some());
        assert!(registry.remove(&"b".into()).is_none());

        let ids: Vec<_> = registry.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, [TaskId::from("a"), TaskId::from("c")]);
    }

    #[test]
    fn test_reduce_event_sequence() {
        let mut registry = TaskRegistry::new();
        registry.register("m1".into(), "m1").unwrap();

        let events = [
            PushEvent::Progress(ProgressEvent::start("m1", "a.bin")),
            PushEvent::Progress(ProgressEvent::chunk("m1", "a.bin", 50, 100)),
            PushEvent::Progress(ProgressEvent::chunk("m1", "a.bin", 20, 100)),
            PushEvent::Complete(CompleteEvent {
                task_id: "m1".into(),
                path: "/models/m1".into(),
                total_size_bytes: 0,
            }),
        ];

        let mut completions = 0;
        for event in &events {
            let (next, outcome) = registry.reduce(event);
            registry = next;
            if outcome.is_completion() {
                completions += 1;
            }
        }

        let task = registry.get(&"m1".into()).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.progress, 100);
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_apply_recovers_unknown_complete() {
        let mut registry = TaskRegistry::new();
        let outcome = registry.apply(&PushEvent::Complete(CompleteEvent {
            task_id: "late".into(),
            path: "/x".into(),
            total_size_bytes: 0,
        }));
        assert!(matches!(outcome, Reconciled::Recovered(_)));
        assert!(registry.contains(&"late".into()));
    }
}
