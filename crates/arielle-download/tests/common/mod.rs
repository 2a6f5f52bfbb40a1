//! Shared fakes for coordinator integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{Notify, mpsc};

use arielle_download::{
    CoordinatorDeps, CredentialStorePort, DownloadCoordinator, DownloadTask, Notification,
    NotifierPort, PushMessage, RemoteCancelError, RemoteCancelPort, StaticCredentialStore,
    TaskEvent, TaskEventEmitterPort, TaskHooks, TaskId,
};

pub const WAIT: Duration = Duration::from_secs(5);

// ── Notifier ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn keys(&self) -> Vec<String> {
        self.sent.lock().iter().map(|n| n.key.clone()).collect()
    }

    pub fn with_key(&self, key: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.key == key)
            .cloned()
            .collect()
    }

    pub fn count(&self, key: &str) -> usize {
        self.with_key(key).len()
    }
}

impl NotifierPort for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

// ── Emitter ────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<TaskEvent>>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().clone()
    }

    /// Snapshots emitted for `id`, in order.
    pub fn updates(&self, id: &str) -> Vec<DownloadTask> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TaskEvent::Updated { task } if task.id.as_str() == id => Some(task.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TaskEventEmitterPort for RecordingEmitter {
    fn emit(&self, event: TaskEvent) {
        self.events.lock().push(event);
    }

    fn clone_box(&self) -> Box<dyn TaskEventEmitterPort> {
        Box::new(self.clone())
    }
}

// ── Remote cancel ──────────────────────────────────────────────────

/// Counts cancel requests and forwards each id to a channel.
pub struct FakeRemoteCancel {
    calls: AtomicUsize,
    tx: mpsc::UnboundedSender<TaskId>,
}

impl FakeRemoteCancel {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TaskId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                tx,
            }),
            rx,
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCancelPort for FakeRemoteCancel {
    async fn cancel_remote(&self, id: &TaskId) -> Result<(), RemoteCancelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(id.clone());
        Ok(())
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub coordinator: Arc<DownloadCoordinator>,
    pub notifier: RecordingNotifier,
    pub emitter: RecordingEmitter,
    pub remote: Arc<FakeRemoteCancel>,
    pub remote_rx: mpsc::UnboundedReceiver<TaskId>,
    pub completed: Arc<Mutex<Vec<TaskId>>>,
    pub started: Arc<Mutex<Vec<TaskId>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_credentials(Arc::new(StaticCredentialStore::empty()))
    }

    pub fn with_token(token: &str) -> Self {
        Self::with_credentials(Arc::new(StaticCredentialStore::new(token)))
    }

    pub fn with_credentials(credentials: Arc<dyn CredentialStorePort>) -> Self {
        let notifier = RecordingNotifier::default();
        let emitter = RecordingEmitter::default();
        let (remote, remote_rx) = FakeRemoteCancel::new();
        let completed = Arc::new(Mutex::new(Vec::new()));
        let started = Arc::new(Mutex::new(Vec::new()));

        let on_complete = Arc::clone(&completed);
        let on_start = Arc::clone(&started);
        let hooks = TaskHooks::new()
            .on_start(move |task| on_start.lock().push(task.id.clone()))
            .on_complete(move |task| on_complete.lock().push(task.id.clone()));

        let deps = CoordinatorDeps::new(remote.clone())
            .with_notifier(Arc::new(notifier.clone()))
            .with_emitter(Arc::new(emitter.clone()))
            .with_credentials(credentials)
            .with_hooks(hooks);

        Self {
            coordinator: Arc::new(DownloadCoordinator::new(deps)),
            notifier,
            emitter,
            remote,
            remote_rx,
            completed,
            started,
        }
    }

    pub fn task(&self, id: &str) -> DownloadTask {
        self.coordinator
            .get(&TaskId::from(id))
            .unwrap_or_else(|| panic!("task {id} missing"))
    }

    /// Wait for the next remote cancel request.
    pub async fn next_remote_cancel(&mut self) -> TaskId {
        tokio::time::timeout(WAIT, self.remote_rx.recv())
            .await
            .expect("remote cancel not sent")
            .expect("remote cancel channel closed")
    }
}

/// Poll `check` until it holds or the wait budget runs out.
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Await with the shared wait budget.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("future did not resolve in time")
}

/// Latch a transfer opens once it is running.
#[derive(Clone, Default)]
pub struct Gate {
    notify: Arc<Notify>,
}

impl Gate {
    pub fn open(&self) {
        self.notify.notify_one();
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

// ── Push messages ──────────────────────────────────────────────────

pub fn chunk(id: &str, loaded: u64, total_bytes: u64) -> PushMessage {
    PushMessage::new(
        "hf_download_progress",
        json!({
            "model_id": id,
            "phase": "chunk",
            "file": "model.safetensors",
            "loaded": loaded,
            "total_bytes": total_bytes,
        }),
    )
}

pub fn complete(id: &str, path: &str) -> PushMessage {
    PushMessage::new(
        "hf_download_complete",
        json!({
            "model_id": id,
            "path": path,
            "total_size_bytes": 1_048_576,
        }),
    )
}
