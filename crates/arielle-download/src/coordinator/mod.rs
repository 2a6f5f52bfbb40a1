//! Download coordinator.
//!
//! Owns the task registry and the table of live transfers, runs each task's
//! transfer on its own tokio task, and overlays push-channel events onto the
//! same registry.
//!
//! # Concurrency Model
//!
//! - One `parking_lot::Mutex` guards registry and active table; it is never
//!   held across an `.await`, and ports are called only after it is released
//! - Every transfer holds a lease; commits from a stale lease are dropped
//! - Cancellation is cooperative through a per-task `CancellationToken`
//! - Exactly one terminal commit per lease, so exactly one terminal
//!   notification per run

mod runner;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use arielle_core::{
    CoordinatorConfig, CredentialStorePort, DownloadError, DownloadResult, DownloadTask,
    NoopNotifier, NoopTaskEmitter, Notification, NotifierPort, PushEvent, PushMessage,
    Reconciled, RemoteCancelPort, TaskEvent, TaskEventEmitterPort, TaskHooks, TaskId,
    TaskRegistry, TaskStatus,
};

use crate::credentials::StaticCredentialStore;
use crate::transfer::TransferOperation;

use runner::Job;

/// Lease for one execution of a task.
///
/// Re-creating a task with the same id mints a new lease, so commits from the
/// previous run can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeaseId(u64);

/// A transfer currently owned by the coordinator.
struct ActiveTransfer {
    lease: LeaseId,
    cancel: CancellationToken,
    abort: Option<AbortHandle>,
}

impl ActiveTransfer {
    /// Signal the transfer and abort its runner.
    fn stop(&self) {
        self.cancel.cancel();
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

#[derive(Default)]
struct State {
    registry: TaskRegistry,
    active: HashMap<TaskId, ActiveTransfer>,
}

impl State {
    fn holds(&self, id: &TaskId, lease: LeaseId) -> bool {
        self.active.get(id).is_some_and(|a| a.lease == lease)
    }

    /// Verify the lease and drop the active entry.
    fn release(&mut self, id: &TaskId, lease: LeaseId) -> bool {
        self.holds(id, lease)
            .then(|| self.active.remove(id))
            .is_some()
    }
}

/// Collaborators injected into the coordinator.
#[derive(Clone)]
pub struct CoordinatorDeps {
    /// Sink for user-facing notifications.
    pub notifier: Arc<dyn NotifierPort>,
    /// Stored access token.
    pub credentials: Arc<dyn CredentialStorePort>,
    /// Backend cancel endpoint.
    pub remote_cancel: Arc<dyn RemoteCancelPort>,
    /// Registry change observer.
    pub emitter: Arc<dyn TaskEventEmitterPort>,
    /// Lifecycle callbacks.
    pub hooks: TaskHooks,
    /// Behavior settings.
    pub config: CoordinatorConfig,
}

impl CoordinatorDeps {
    /// Create deps with no-op notifier and emitter and no stored credential.
    pub fn new(remote_cancel: Arc<dyn RemoteCancelPort>) -> Self {
        Self {
            notifier: Arc::new(NoopNotifier),
            credentials: Arc::new(StaticCredentialStore::empty()),
            remote_cancel,
            emitter: Arc::new(NoopTaskEmitter::new()),
            hooks: TaskHooks::default(),
            config: CoordinatorConfig::default(),
        }
    }

    /// Set the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotifierPort>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the credential store.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStorePort>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the task event emitter.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn TaskEventEmitterPort>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Set lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: TaskHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for CoordinatorDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorDeps")
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Request to start tracking a new download.
#[derive(Clone)]
pub struct TaskRequest {
    /// Task id (typically the model id).
    pub id: TaskId,
    /// Label shown to the user.
    pub display_name: String,
    /// Transfer to run.
    pub operation: Arc<dyn TransferOperation>,
}

impl TaskRequest {
    /// Create a request.
    pub fn new(
        id: impl Into<TaskId>,
        display_name: impl Into<String>,
        operation: impl TransferOperation + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            operation: Arc::new(operation),
        }
    }
}

/// Handle to a spawned task run.
#[derive(Debug)]
pub struct TaskRun {
    id: TaskId,
    handle: JoinHandle<Option<DownloadTask>>,
}

impl TaskRun {
    /// Id of the task.
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Whether the runner has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the runner to exit.
    ///
    /// Returns the terminal snapshot it committed, or `None` when the run was
    /// superseded or removed before it could commit.
    pub async fn wait(self) -> Option<DownloadTask> {
        self.handle.await.ok().flatten()
    }
}

/// Coordinates download tasks, their cancellation and push reconciliation.
///
/// Share it as `Arc<DownloadCoordinator>`; several coordinators may coexist.
pub struct DownloadCoordinator {
    state: Mutex<State>,
    deps: CoordinatorDeps,
    lease_counter: AtomicU64,
    shutdown: CancellationToken,
    remote_cancels: TaskTracker,
}

impl DownloadCoordinator {
    /// Create a coordinator.
    pub fn new(deps: CoordinatorDeps) -> Self {
        Self {
            state: Mutex::new(State::default()),
            deps,
            lease_counter: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            remote_cancels: TaskTracker::new(),
        }
    }

    /// Register a task and spawn its transfer.
    ///
    /// An id that is already `pending` or `in-progress` is rejected with
    /// [`DownloadError::AlreadyActive`] and a `dup-{id}` notification.
    pub fn create_task(self: &Arc<Self>, request: TaskRequest) -> DownloadResult<TaskRun> {
        if self.shutdown.is_cancelled() {
            return Err(DownloadError::Disposed);
        }

        let TaskRequest {
            id,
            display_name,
            operation,
        } = request;
        let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();

        // A task made terminal by the push channel may still own a running
        // transfer; the new lease displaces it.
        let (registered, superseded) = {
            let mut state = self.state.lock();
            let registered = state
                .registry
                .register(id.clone(), display_name.clone())
                .cloned();
            let superseded = if registered.is_ok() {
                state.active.insert(
                    id.clone(),
                    ActiveTransfer {
                        lease,
                        cancel: cancel.clone(),
                        abort: None,
                    },
                )
            } else {
                None
            };
            if let Some(previous) = &superseded {
                previous.stop();
            }
            (registered, superseded.is_some())
        };

        let task = match registered {
            Ok(task) => task,
            Err(err) => {
                tracing::info!(target: "arielle.download", id = %id, "Rejected duplicate task");
                self.deps
                    .notifier
                    .notify(Notification::duplicate(&id, &display_name));
                return Err(err);
            }
        };

        if superseded {
            tracing::info!(target: "arielle.download", id = %id, "Stopped transfer left over from previous run");
        }
        tracing::info!(target: "arielle.download", id = %id, name = %display_name, "Task created");
        self.emit(TaskEvent::Updated { task: task.clone() });
        self.deps.hooks.fire_start(&task);

        let job = Job {
            id: id.clone(),
            lease,
            cancel,
            operation,
        };
        let handle = tokio::spawn(Arc::clone(self).run_task(job));

        {
            let mut state = self.state.lock();
            if let Some(active) = state.active.get_mut(&id).filter(|a| a.lease == lease) {
                active.abort = Some(handle.abort_handle());
            }
        }

        Ok(TaskRun { id, handle })
    }

    /// Cancel a running task.
    ///
    /// Returns `true` only when an `in-progress` task with a live cancellation
    /// handle was signalled. The status changes to `canceled` once the
    /// transfer observes the signal. A best-effort remote cancel is sent in
    /// the background.
    pub fn cancel(&self, id: &TaskId) -> bool {
        {
            let state = self.state.lock();
            let running = state
                .registry
                .get(id)
                .is_some_and(|t| t.status == TaskStatus::InProgress);
            let Some(active) = state
                .active
                .get(id)
                .filter(|a| running && !a.cancel.is_cancelled())
            else {
                tracing::debug!(target: "arielle.download", id = %id, "Cancel ignored: nothing running");
                return false;
            };
            active.cancel.cancel();
        }

        tracing::info!(
            target: "arielle.download",
            id = %id,
            reason = %self.deps.config.cancel_reason,
            "Cancel requested"
        );
        self.spawn_remote_cancel(id);
        true
    }

    /// Remove a task, cancelling it first if it is running.
    pub fn remove_task(&self, id: &TaskId) -> Option<DownloadTask> {
        let (removed, was_running) = {
            let mut state = self.state.lock();
            let running = state
                .registry
                .get(id)
                .is_some_and(|t| t.status == TaskStatus::InProgress);
            let was_running = state.active.remove(id).is_some_and(|active| {
                let live = running && !active.cancel.is_cancelled();
                active.stop();
                live
            });
            (state.registry.remove(id), was_running)
        };

        if was_running {
            self.spawn_remote_cancel(id);
        }
        if removed.is_some() {
            tracing::info!(target: "arielle.download", id = %id, "Task removed");
            self.emit(TaskEvent::Removed { id: id.clone() });
        }
        removed
    }

    /// Decode one push message and fold it into the registry.
    ///
    /// Unrelated and malformed messages are logged and dropped.
    pub fn apply_push(&self, message: &PushMessage) -> Reconciled {
        let event = match PushEvent::decode(message) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::trace!(target: "arielle.download", event = %message.event, "Ignoring unrelated push event");
                return Reconciled::Unchanged;
            }
            Err(err) => {
                tracing::warn!(target: "arielle.download", error = %err, "Dropping malformed push event");
                return Reconciled::Unchanged;
            }
        };

        let outcome = self.state.lock().registry.apply(&event);

        if let Some(task) = outcome.task() {
            self.emit(TaskEvent::Updated { task: task.clone() });
            if outcome.is_completion() {
                tracing::info!(
                    target: "arielle.download",
                    id = %task.id,
                    recovered = matches!(outcome, Reconciled::Recovered(_)),
                    "Backend reported completion"
                );
                self.deps
                    .notifier
                    .notify(Notification::completed(&task.id, &task.display_name));
                self.deps.hooks.fire_complete(task);
            }
        }
        outcome
    }

    /// Start pumping push messages from `rx` into the registry.
    ///
    /// The pump stops on [`DownloadCoordinator::dispose`] or when the channel
    /// closes.
    pub fn init(self: &Arc<Self>, mut rx: mpsc::Receiver<PushMessage>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tracing::debug!(target: "arielle.download", "Push pump started");
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    message = rx.recv() => match message {
                        Some(message) => {
                            coordinator.apply_push(&message);
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!(target: "arielle.download", "Push pump stopped");
        })
    }

    /// Stop the push pump and abort every running transfer locally.
    ///
    /// Aborted tasks still settle as `canceled`. No remote cancel is sent and
    /// new tasks are rejected afterwards.
    pub fn dispose(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();

        let aborted = {
            let state = self.state.lock();
            for active in state.active.values() {
                active.cancel.cancel();
            }
            state.active.len()
        };
        tracing::info!(target: "arielle.download", aborted, "Coordinator disposed");
    }

    /// Dispose, then wait for in-flight remote cancels to finish.
    ///
    /// Lets a short-lived process exit without dropping the backend cancel
    /// request it just issued.
    pub async fn shutdown(&self) {
        self.dispose();
        self.remote_cancels.close();
        self.remote_cancels.wait().await;
    }

    /// Whether [`DownloadCoordinator::dispose`] was called.
    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Ordered copy of every task.
    pub fn snapshot(&self) -> Vec<DownloadTask> {
        self.state.lock().registry.snapshot()
    }

    /// Copy of one task.
    pub fn get(&self, id: &TaskId) -> Option<DownloadTask> {
        self.state.lock().registry.get(id).cloned()
    }

    /// Number of transfers currently owned by the coordinator.
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    fn emit(&self, event: TaskEvent) {
        self.deps.emitter.emit(event);
    }

    fn stored_token(&self) -> Option<String> {
        self.deps
            .credentials
            .token()
            .filter(|token| !token.trim().is_empty())
    }

    fn spawn_remote_cancel(&self, id: &TaskId) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(target: "arielle.download", id = %id, "No runtime available, skipping remote cancel");
            return;
        };
        let remote = Arc::clone(&self.deps.remote_cancel);
        let id = id.clone();
        let request = async move {
            match remote.cancel_remote(&id).await {
                Ok(()) => {
                    tracing::debug!(target: "arielle.download", id = %id, "Remote cancel delivered");
                }
                Err(err) => {
                    tracing::warn!(target: "arielle.download", id = %id, error = %err, "Remote cancel failed");
                }
            }
        };
        self.remote_cancels.spawn_on(request, &runtime);
    }
}

impl fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DownloadCoordinator")
            .field("tasks", &state.registry.len())
            .field("active", &state.active.len())
            .field("disposed", &self.shutdown.is_cancelled())
            .finish()
    }
}
