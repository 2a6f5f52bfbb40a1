//! Download coordinator runtime for Arielle.
//!
//! - `coordinator` - task runs, cancellation, push reconciliation
//! - `transfer` - the per-attempt transfer abstraction
//! - `http` - backend download and cancel adapters
//! - `push` - Socket.IO push-channel client
//! - `credentials`, `notify` - port adapters

#![deny(unused_crate_dependencies)]

// Re-export core types for convenience
pub use arielle_core::{
    CoordinatorConfig, CredentialStorePort, DownloadError, DownloadResult, DownloadTask,
    ErrorCode, NoopNotifier, NoopTaskEmitter, Notification, NotifierPort, PushMessage,
    Reconciled, RemoteCancelError, RemoteCancelPort, TaskEvent, TaskEventEmitterPort, TaskHooks,
    TaskId, TaskStatus, TransferError,
};

mod coordinator;
pub mod credentials;
pub mod http;
pub mod notify;
pub mod push;
pub mod transfer;

pub use coordinator::{CoordinatorDeps, DownloadCoordinator, TaskRequest, TaskRun};
pub use credentials::{EnvCredentialStore, HF_TOKEN_VAR, StaticCredentialStore};
pub use http::{BackendConfig, DEFAULT_BACKEND_URL, HttpRemoteCancel, HttpTransfer};
pub use notify::{DEFAULT_DEDUP_WINDOW, DedupNotifier, TracingNotifier};
pub use push::{DEFAULT_PUSH_URL, PushChannelConfig, PushChannelError, PushClient};
pub use transfer::{FnTransfer, ProgressFn, TransferContext, TransferOperation, transfer_fn};

// Dev-dependency used only by integration tests
#[cfg(test)]
use mockall as _;
