//! One-shot credential retry for authorization failures.
//!
//! ```text
//! Initial --failure--> classify
//!   cancelled           -> Fail(Cancelled)
//!   auth, no token      -> Fail(CredentialMissing)
//!   auth, token         -> Retry(token) --> Retried
//!   other               -> Fail(Failed)
//! Retried --failure--> classify
//!   cancelled           -> Fail(Cancelled)
//!   anything else       -> Fail(CredentialRejected)
//! ```
//!
//! `Retried` has no edge back to `Retry`, so a task is attempted at most
//! `MAX_ATTEMPTS` times.

use crate::failure::{FailureClass, TransferError, classify};
use crate::task::ErrorCode;

/// Upper bound on attempts for a single task (first attempt + one retry).
pub const MAX_ATTEMPTS: u32 = 2;

/// Where the policy currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// First attempt in flight.
    Initial,
    /// The single credential retry is in flight.
    Retried,
}

/// Terminal outcome of a failed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The transfer observed its abort signal.
    Cancelled,
    /// Authorization failed and no stored credential exists.
    CredentialMissing,
    /// Authorization still failed with the stored credential.
    CredentialRejected,
    /// Any non-authorization failure.
    Failed {
        /// Classified error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

impl TaskFailure {
    /// Error code to store on the task, if the outcome is an error.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Cancelled => None,
            Self::CredentialMissing | Self::CredentialRejected => Some(ErrorCode::AuthRequired),
            Self::Failed { code, .. } => Some(*code),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt again with this credential.
    Retry {
        /// Credential to attach to the retry.
        token: String,
    },
    /// Stop; the task ends with this failure.
    Fail(TaskFailure),
}

/// Explicit state machine for the authorization retry.
#[derive(Debug, Clone)]
pub struct AuthRetryPolicy {
    state: RetryState,
}

impl Default for AuthRetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthRetryPolicy {
    /// Create a policy for a fresh task.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RetryState::Initial,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RetryState {
        self.state
    }

    /// Number of attempts started so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self.state {
            RetryState::Initial => 1,
            RetryState::Retried => MAX_ATTEMPTS,
        }
    }

    /// Decide what follows a failed attempt.
    ///
    /// `stored_token` is only consulted for an authorization failure on the
    /// first attempt; empty tokens count as absent.
    pub fn on_failure<F>(&mut self, err: &TransferError, stored_token: F) -> RetryDecision
    where
        F: FnOnce() -> Option<String>,
    {
        let class = classify(err);
        match (self.state, class) {
            (_, FailureClass::Cancelled) => RetryDecision::Fail(TaskFailure::Cancelled),
            (RetryState::Initial, FailureClass::Auth) => {
                match stored_token().filter(|t| !t.is_empty()) {
                    Some(token) => {
                        self.state = RetryState::Retried;
                        RetryDecision::Retry { token }
                    }
                    None => RetryDecision::Fail(TaskFailure::CredentialMissing),
                }
            }
            (RetryState::Initial, FailureClass::Failed(code)) => {
                RetryDecision::Fail(TaskFailure::Failed {
                    code,
                    message: err.message().to_string(),
                })
            }
            (RetryState::Retried, _) => RetryDecision::Fail(TaskFailure::CredentialRejected),
        }
    }
}
