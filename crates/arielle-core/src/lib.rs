//! Core domain types and ports for the Arielle download coordinator.
//!
//! This crate is pure: task state, progress math, push-event reconciliation,
//! failure classification and the retry policy live here, with no I/O. The
//! runtime (coordinator, HTTP and push-channel adapters) lives in
//! `arielle-download`.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod errors;
pub mod failure;
pub mod notify;
pub mod ports;
pub mod progress;
pub mod push;
pub mod reconcile;
pub mod retry;
pub mod task;

pub use config::{CoordinatorConfig, DEFAULT_CANCEL_REASON};
pub use errors::{DownloadError, DownloadResult};
pub use failure::{
    AUTH_KEYWORDS, BACKEND_CANCEL_MARKER, FailureClass, TransferError, classify, is_auth_failure,
    is_backend_cancellation,
};
pub use notify::{DEFAULT_SETTINGS_URL, Notification, NotificationAction, Variant};
pub use ports::{
    CompleteHook, CredentialStorePort, NoopNotifier, NoopTaskEmitter, NotifierPort,
    RemoteCancelError, RemoteCancelPort, StartHook, TaskEvent, TaskEventEmitterPort, TaskHooks,
};
pub use progress::{BYTES_PER_MB, ETA_EPSILON, Estimate, SampleWindow, estimate};
pub use push::{
    COMPLETE_EVENT, CompleteEvent, PROGRESS_EVENT, Phase, ProgressEvent, PushDecodeError,
    PushEvent, PushMessage,
};
pub use reconcile::{Reconciled, reconcile};
pub use retry::{AuthRetryPolicy, MAX_ATTEMPTS, RetryDecision, RetryState, TaskFailure};
pub use task::{DownloadTask, ErrorCode, TaskId, TaskRegistry, TaskStatus};
