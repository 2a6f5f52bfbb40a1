//! Core domain types for download tasks.
//!
//! Pure data types with no I/O dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::progress::Estimate;

/// Stable identifier for a download task (typically a model id such as
/// `openai/whisper-small`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new task ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Status of a download task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Registered, transfer not started yet.
    Pending,
    /// Transfer running.
    InProgress,
    /// Completed successfully.
    Done,
    /// Failed with an error code.
    Error,
    /// Cancelled by the user.
    Canceled,
}

impl TaskStatus {
    /// Whether no further transition is expected from this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Canceled)
    }

    /// Whether the task still occupies its id (`pending` or `in-progress`).
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// String form used on the wire and in notification keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Error => "error",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified reason for a task ending in `error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The remote requires (different) credentials.
    AuthRequired,
    /// Client-side or transport failure with a status.
    Network,
    /// Remote failure (status >= 500).
    Server,
    /// No status or structured message could be extracted.
    Unknown,
}

impl ErrorCode {
    /// Map an HTTP-style status (if any) to an error code.
    ///
    /// Authorization failures are classified separately and never reach this.
    #[must_use]
    pub const fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(s) if s >= 500 => Self::Server,
            Some(_) => Self::Network,
            None => Self::Unknown,
        }
    }

    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth-required",
            Self::Network => "network",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked download.
///
/// The cancellation handle is not part of this snapshot; the coordinator owns
/// it alongside the task's lease and drops it on every terminal transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Primary key.
    pub id: TaskId,
    /// Human-readable label; may change without affecting identity.
    pub display_name: String,
    /// Most recent fine-grained label (e.g. `model/file.bin`).
    pub detail_label: String,
    /// Percentage 0-100.
    pub progress: u8,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Total size once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_mb: Option<f64>,
    /// Instantaneous rate, only while in progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mbps: Option<f64>,
    /// Remaining seconds, only while in progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_sec: Option<f64>,
    /// Location of the completed artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Set only when `status == Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl DownloadTask {
    /// Create a fresh `pending` task.
    pub fn pending(id: TaskId, display_name: impl Into<String>) -> Self {
        let detail_label = id.to_string();
        Self {
            id,
            display_name: display_name.into(),
            detail_label,
            progress: 0,
            status: TaskStatus::Pending,
            size_mb: None,
            speed_mbps: None,
            eta_sec: None,
            path: None,
            error_code: None,
        }
    }

    /// Whether the task reached `done`, `error` or `canceled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Raise progress to `percent` if it is higher than the stored value.
    pub fn raise_progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(100));
    }

    /// Apply one local byte sample.
    ///
    /// Returns `false` (and changes nothing) once the task is terminal.
    pub fn apply_estimate(&mut self, estimate: &Estimate) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::InProgress;
        self.speed_mbps = estimate.speed_mbps;
        self.eta_sec = estimate.eta_sec;
        if let Some(percent) = estimate.percent {
            self.raise_progress(percent);
        }
        true
    }

    /// Transition to `done`.
    pub fn complete(&mut self, path: Option<String>) {
        self.status = TaskStatus::Done;
        self.progress = 100;
        if path.is_some() {
            self.path = path;
        }
        self.error_code = None;
        self.clear_rates();
    }

    /// Transition to `error` with a classified code.
    pub fn fail(&mut self, code: ErrorCode) {
        self.status = TaskStatus::Error;
        self.error_code = Some(code);
        self.clear_rates();
    }

    /// Transition to `canceled`.
    pub fn cancel(&mut self) {
        self.status = TaskStatus::Canceled;
        self.error_code = None;
        self.clear_rates();
    }

    fn clear_rates(&mut self) {
        self.speed_mbps = None;
        self.eta_sec = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display_matches_wire_name() {
        for code in [
            ErrorCode::AuthRequired,
            ErrorCode::Network,
            ErrorCode::Server,
            ErrorCode::Unknown,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{code}\""));
        }
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");

        let code = serde_json::to_string(&ErrorCode::AuthRequired).unwrap();
        assert_eq!(code, "\"auth-required\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_error_code_from_status() {
        assert_eq!(ErrorCode::from_status(Some(503)), ErrorCode::Server);
        assert_eq!(ErrorCode::from_status(Some(404)), ErrorCode::Network);
        assert_eq!(ErrorCode::from_status(None), ErrorCode::Unknown);
    }

    #[test]
    fn test_terminal_transitions_clear_rates() {
        let mut task = DownloadTask::pending("m1".into(), "Model One");
        task.status = TaskStatus::InProgress;
        task.speed_mbps = Some(4.0);
        task.eta_sec = Some(10.0);

        task.fail(ErrorCode::Network);
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error_code, Some(ErrorCode::Network));
        assert!(task.speed_mbps.is_none());
        assert!(task.eta_sec.is_none());

        task.complete(Some("/models/m1".into()));
        assert_eq!(task.progress, 100);
        assert!(task.error_code.is_none());
        assert_eq!(task.path.as_deref(), Some("/models/m1"));
    }

    #[test]
    fn test_raise_progress_never_regresses() {
        let mut task = DownloadTask::pending("m1".into(), "m1");
        task.raise_progress(40);
        task.raise_progress(20);
        assert_eq!(task.progress, 40);
        task.raise_progress(250);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_apply_estimate() {
        let mut task = DownloadTask::pending("m1".into(), "m1");
        task.progress = 60;
        let applied = task.apply_estimate(&Estimate {
            speed_mbps: Some(2.0),
            eta_sec: Some(3.0),
            percent: Some(10),
        });
        assert!(applied);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.progress, 60);
        assert_eq!(task.speed_mbps, Some(2.0));

        task.cancel();
        assert!(!task.apply_estimate(&Estimate::default()));
        assert_eq!(task.status, TaskStatus::Canceled);
    }

    #[test]
    fn test_snapshot_omits_unset_fields() {
        let task = DownloadTask::pending("m1".into(), "m1");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("path").is_none());
        assert!(json.get("error_code").is_none());
    }
}
