//! Coordinator error types.
//!
//! These errors are serializable so adapters (CLI, IPC bridges) can forward
//! them without depending on runtime error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for registry and coordinator operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// A `pending` or `in-progress` task already owns this id.
    #[error("Already in progress: {id}")]
    AlreadyActive {
        /// The task ID that is already active.
        id: String,
    },

    /// No task with this id is registered.
    #[error("Unknown task: {id}")]
    UnknownTask {
        /// The task ID that wasn't found.
        id: String,
    },

    /// The coordinator was disposed and no longer accepts work.
    #[error("Coordinator disposed")]
    Disposed,
}

impl DownloadError {
    /// Create an already-active error.
    pub fn already_active(id: impl Into<String>) -> Self {
        Self::AlreadyActive { id: id.into() }
    }

    /// Create an unknown-task error.
    pub fn unknown_task(id: impl Into<String>) -> Self {
        Self::UnknownTask { id: id.into() }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyActive { id } => format!("\"{id}\" is already downloading."),
            Self::UnknownTask { id } => format!("No download named \"{id}\"."),
            Self::Disposed => "Downloads are shutting down.".to_string(),
        }
    }
}

/// Convenience result type for coordinator operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = DownloadError::already_active("openai/whisper-small");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("whisper-small"));

        let parsed: DownloadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_user_messages() {
        let err = DownloadError::already_active("m1");
        assert!(err.user_message().contains("already downloading"));
        assert!(DownloadError::Disposed.user_message().contains("shutting down"));
    }
}
