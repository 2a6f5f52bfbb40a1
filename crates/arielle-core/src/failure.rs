//! Transfer failures and their classification.
//!
//! A transfer operation reports failures as `TransferError`. The coordinator
//! sorts them into cancellation, authorization, and everything else before a
//! task reaches its terminal state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::ErrorCode;

/// Keywords that mark a failure message as an authorization problem.
pub const AUTH_KEYWORDS: &[&str] = &[
    "unauthorized",
    "forbidden",
    "private",
    "requires",
    "authorization",
    "auth",
];

/// Message the backend answers with (as a 500) when a download was cancelled
/// through its cancel endpoint, possibly by another client.
pub const BACKEND_CANCEL_MARKER: &str = "Download canceled by user";

/// Failure raised by one transfer attempt.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransferError {
    /// The attempt observed its cancellation handle and stopped.
    #[error("Transfer cancelled: {reason}")]
    Cancelled {
        /// Reason passed to the abort signal.
        reason: String,
    },

    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body message or status text.
        message: String,
    },

    /// Connection or protocol failure below the HTTP response.
    #[error("Transport error: {message}")]
    Transport {
        /// Status attached by the client library, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Detailed error message.
        message: String,
    },

    /// Anything without an extractable status.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl TransferError {
    /// Create a cancellation error.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// HTTP-style status if one was extracted.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { status, .. } => *status,
            Self::Cancelled { .. } | Self::Other { .. } => None,
        }
    }

    /// The human-readable part of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Cancelled { reason } => reason,
            Self::Status { message, .. }
            | Self::Transport { message, .. }
            | Self::Other { message } => message,
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Whether a status/message pair signals missing or insufficient credentials.
#[must_use]
pub fn is_auth_failure(status: Option<u16>, message: &str) -> bool {
    if matches!(status, Some(401 | 403)) {
        return true;
    }
    let lowered = message.to_lowercase();
    AUTH_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Whether a status/message pair is the backend reporting a cancelled download.
#[must_use]
pub fn is_backend_cancellation(status: Option<u16>, message: &str) -> bool {
    status == Some(500) && message.contains(BACKEND_CANCEL_MARKER)
}

/// Classification of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// User cancellation; never carries an error code.
    Cancelled,
    /// Authorization failure, eligible for the one-shot credential retry.
    Auth,
    /// Any other failure, with its error code.
    Failed(ErrorCode),
}

/// Classify a transfer failure.
#[must_use]
pub fn classify(err: &TransferError) -> FailureClass {
    let status = err.status_code();
    if err.is_cancelled() || is_backend_cancellation(status, err.message()) {
        return FailureClass::Cancelled;
    }
    if is_auth_failure(status, err.message()) {
        return FailureClass::Auth;
    }
    FailureClass::Failed(ErrorCode::from_status(status))
}
