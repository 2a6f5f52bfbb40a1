//! Per-task runner.
//!
//! Drives the attempts of one task through the auth-retry policy and funnels
//! every outcome (success, failure, cancellation) into a single terminal
//! commit guarded by the task's lease.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use arielle_core::{
    AuthRetryPolicy, CoordinatorConfig, DownloadTask, ErrorCode, Notification, RetryDecision,
    SampleWindow, TaskEvent, TaskFailure, TaskId, TaskStatus, TransferError,
};

use super::{DownloadCoordinator, LeaseId};
use crate::transfer::{ProgressFn, TransferContext, TransferOperation};

/// A task run handed to the runner. Value type, no references back into the
/// coordinator's state.
pub(super) struct Job {
    pub id: TaskId,
    pub lease: LeaseId,
    pub cancel: CancellationToken,
    pub operation: Arc<dyn TransferOperation>,
}

/// What a terminal commit changed.
#[derive(Debug, Default)]
struct Settlement {
    changed: bool,
    completed: bool,
    notification: Option<Notification>,
}

impl DownloadCoordinator {
    pub(super) async fn run_task(self: Arc<Self>, job: Job) -> Option<DownloadTask> {
        let Job {
            id,
            lease,
            cancel,
            operation,
        } = job;

        if !self.state.lock().holds(&id, lease) {
            tracing::debug!(target: "arielle.download", id = %id, "Run superseded before start");
            return None;
        }

        self.commit_attempt(&id, lease, |task| {
            if task.is_terminal() {
                return false;
            }
            task.status = TaskStatus::InProgress;
            true
        });

        let window = Arc::new(Mutex::new(SampleWindow::new(Instant::now())));
        let mut policy = AuthRetryPolicy::new();
        let mut token = self.stored_token();

        let outcome = loop {
            tracing::info!(
                target: "arielle.download",
                id = %id,
                attempt = policy.attempts(),
                authorized = token.is_some(),
                "Transfer attempt started"
            );

            let ctx = TransferContext::new(
                id.clone(),
                token.clone(),
                cancel.clone(),
                self.progress_sink(&id, lease, &window),
            );

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    Err(TransferError::cancelled(self.deps.config.cancel_reason.clone()))
                }
                result = operation.run(ctx) => result,
            };

            match result {
                Ok(path) => break Ok(path),
                Err(err) => match policy.on_failure(&err, || self.stored_token()) {
                    RetryDecision::Retry { token: next } => {
                        tracing::info!(
                            target: "arielle.download",
                            id = %id,
                            error = %err,
                            "Authorization failed, retrying with stored credential"
                        );
                        token = Some(next);
                        window.lock().reset(Instant::now());
                    }
                    RetryDecision::Fail(failure) => {
                        tracing::debug!(target: "arielle.download", id = %id, error = %err, "Attempt failed");
                        break Err(failure);
                    }
                },
            }
        };

        self.finish(&id, lease, outcome)
    }

    /// Progress callback for one run; drops samples once the lease is gone.
    fn progress_sink(
        self: &Arc<Self>,
        id: &TaskId,
        lease: LeaseId,
        window: &Arc<Mutex<SampleWindow>>,
    ) -> ProgressFn {
        let coordinator = Arc::downgrade(self);
        let id = id.clone();
        let window = Arc::clone(window);
        Arc::new(move |loaded, total| {
            let Some(coordinator) = coordinator.upgrade() else {
                return;
            };
            let estimate = window.lock().observe(loaded, total, Instant::now());
            coordinator.commit_attempt(&id, lease, |task| task.apply_estimate(&estimate));
        })
    }

    /// Mutate a task while its lease is held; emits when `mutate` reports a change.
    fn commit_attempt<F>(&self, id: &TaskId, lease: LeaseId, mutate: F) -> Option<DownloadTask>
    where
        F: FnOnce(&mut DownloadTask) -> bool,
    {
        let task = {
            let mut state = self.state.lock();
            if !state.holds(id, lease) {
                return None;
            }
            let mut changed = false;
            let task = state.registry.update(id, |task| changed = mutate(task))?;
            changed.then_some(task)?
        };
        self.emit(TaskEvent::Updated { task: task.clone() });
        Some(task)
    }

    /// Release the lease and commit the terminal outcome.
    fn finish(
        &self,
        id: &TaskId,
        lease: LeaseId,
        outcome: Result<String, TaskFailure>,
    ) -> Option<DownloadTask> {
        let (task, settlement) = {
            let mut state = self.state.lock();
            if !state.release(id, lease) {
                tracing::debug!(target: "arielle.download", id = %id, "Ignoring stale finalize (lease mismatch)");
                return None;
            }
            let mut settlement = Settlement::default();
            let task = state
                .registry
                .update(id, |task| settlement = settle(task, outcome, &self.deps.config))?;
            (task, settlement)
        };

        log_terminal(&task, &settlement);

        if settlement.changed {
            self.emit(TaskEvent::Updated { task: task.clone() });
        }
        if let Some(notification) = settlement.notification {
            self.deps.notifier.notify(notification);
        }
        if settlement.completed {
            self.deps.hooks.fire_complete(&task);
        }
        Some(task)
    }
}

/// Apply a run's outcome to its task.
///
/// A task already made terminal by the push channel keeps its state; a local
/// success only fills in a missing path.
fn settle(
    task: &mut DownloadTask,
    outcome: Result<String, TaskFailure>,
    config: &CoordinatorConfig,
) -> Settlement {
    match outcome {
        Ok(path) if task.status == TaskStatus::Done => {
            let changed = task.path.is_none();
            if changed {
                task.path = Some(path);
            }
            Settlement {
                changed,
                ..Settlement::default()
            }
        }
        Ok(path) => {
            task.complete(Some(path));
            Settlement {
                changed: true,
                completed: true,
                notification: Some(Notification::completed(&task.id, &task.display_name)),
            }
        }
        Err(_) if task.is_terminal() => Settlement::default(),
        Err(failure) => {
            let notification = match &failure {
                TaskFailure::Cancelled => {
                    task.cancel();
                    Notification::canceled(&task.id, &task.display_name)
                }
                TaskFailure::CredentialMissing => {
                    task.fail(ErrorCode::AuthRequired);
                    Notification::credential_missing(&task.id, &config.settings_url)
                }
                TaskFailure::CredentialRejected => {
                    task.fail(ErrorCode::AuthRequired);
                    Notification::credential_rejected(&task.id, &config.settings_url)
                }
                TaskFailure::Failed { code, message } => {
                    task.fail(*code);
                    Notification::failed(&task.id, message)
                }
            };
            Settlement {
                changed: true,
                completed: false,
                notification: Some(notification),
            }
        }
    }
}

fn log_terminal(task: &DownloadTask, settlement: &Settlement) {
    if !settlement.changed {
        tracing::debug!(target: "arielle.download", id = %task.id, status = %task.status, "Run ended on settled task");
        return;
    }
    match task.status {
        TaskStatus::Done => {
            tracing::info!(target: "arielle.download", id = %task.id, path = ?task.path, "Download completed");
        }
        TaskStatus::Canceled => {
            tracing::info!(target: "arielle.download", id = %task.id, "Download cancelled");
        }
        TaskStatus::Error => {
            tracing::warn!(target: "arielle.download", id = %task.id, code = ?task.error_code, "Download failed");
        }
        TaskStatus::Pending | TaskStatus::InProgress => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arielle_core::Variant;

    fn running() -> DownloadTask {
        let mut task = DownloadTask::pending("m1".into(), "Model One");
        task.status = TaskStatus::InProgress;
        task
    }

    #[test]
    fn test_settle_success() {
        let mut task = running();
        let s = settle(&mut task, Ok("/m1".into()), &CoordinatorConfig::default());
        assert!(s.completed);
        assert_eq!(s.notification.unwrap().key, "done-m1");
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[test]
    fn test_settle_success_after_push_done_fills_path_only() {
        let mut task = running();
        task.complete(None);
        let s = settle(&mut task, Ok("/m1".into()), &CoordinatorConfig::default());
        assert!(s.changed);
        assert!(!s.completed);
        assert!(s.notification.is_none());
        assert_eq!(task.path.as_deref(), Some("/m1"));
    }

    #[test]
    fn test_settle_failure_after_push_done_is_ignored() {
        let mut task = running();
        task.complete(Some("/m1".into()));
        let s = settle(
            &mut task,
            Err(TaskFailure::Cancelled),
            &CoordinatorConfig::default(),
        );
        assert!(!s.changed);
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[test]
    fn test_settle_credential_missing_links_settings() {
        let mut task = running();
        let config = CoordinatorConfig::new().with_settings_url("/x");
        let s = settle(&mut task, Err(TaskFailure::CredentialMissing), &config);
        let n = s.notification.unwrap();
        assert_eq!(n.key, "auth-m1");
        assert_eq!(n.variant, Variant::Warning);
        assert_eq!(n.action.unwrap().target, "/x");
        assert_eq!(task.error_code, Some(ErrorCode::AuthRequired));
    }

    #[test]
    fn test_settle_cancel_has_no_error_code() {
        let mut task = running();
        let s = settle(
            &mut task,
            Err(TaskFailure::Cancelled),
            &CoordinatorConfig::default(),
        );
        assert_eq!(s.notification.unwrap().key, "cancel-m1");
        assert_eq!(task.status, TaskStatus::Canceled);
        assert!(task.error_code.is_none());
    }
}
