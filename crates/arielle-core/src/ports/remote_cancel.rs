//! Remote cancellation port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::TaskId;

/// Failure to deliver a cancel request to the backend.
///
/// Always logged and swallowed by the coordinator; local cancellation has
/// already happened by the time this is observed.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RemoteCancelError {
    /// The backend could not be reached.
    #[error("Cancel request failed: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success status.
    #[error("Cancel request rejected with HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
}

/// Tells the backend to stop producing a task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteCancelPort: Send + Sync {
    /// Request cancellation of `id` on the backend.
    async fn cancel_remote(&self, id: &TaskId) -> Result<(), RemoteCancelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_remote_cancel() {
        let mut mock = MockRemoteCancelPort::new();
        mock.expect_cancel_remote()
            .withf(|id| id.as_str() == "m1")
            .times(1)
            .returning(|_| Err(RemoteCancelError::Rejected { status: 404 }));

        let err = mock.cancel_remote(&"m1".into()).await.unwrap_err();
        assert_eq!(err.to_string(), "Cancel request rejected with HTTP 404");
    }
}
