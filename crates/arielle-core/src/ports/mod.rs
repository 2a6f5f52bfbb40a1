//! Port definitions (trait abstractions) for the coordinator's collaborators.
//!
//! Ports define the interfaces the coordinator expects from the outside world.
//! They use only domain types and contain no transport details.

pub mod credentials;
pub mod hooks;
pub mod notifier;
pub mod remote_cancel;
pub mod task_event_emitter;

pub use credentials::CredentialStorePort;
pub use hooks::{CompleteHook, StartHook, TaskHooks};
pub use notifier::{NoopNotifier, NotifierPort};
pub use remote_cancel::{RemoteCancelError, RemoteCancelPort};
pub use task_event_emitter::{NoopTaskEmitter, TaskEvent, TaskEventEmitterPort};
