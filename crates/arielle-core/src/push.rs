//! Push-channel event model.
//!
//! The backend pushes two named events over its real-time channel:
//!
//! ```text
//! hf_download_progress  { model_id, phase: start|chunk|end, file?, loaded?,
//!                         total_bytes?, index?, total?, size_bytes?, speed_mbps? }
//! hf_download_complete  { model_id, path, total_size_bytes }
//! ```
//!
//! Transports hand over a `PushMessage` (event name + raw JSON); decoding
//! happens here so malformed payloads can be rejected without touching state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::task::TaskId;

/// Event name carrying per-file phase updates.
pub const PROGRESS_EVENT: &str = "hf_download_progress";

/// Event name carrying the final artifact location.
pub const COMPLETE_EVENT: &str = "hf_download_complete";

/// Transport-neutral frame received from the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Event name as sent by the server.
    pub event: String,
    /// Raw payload.
    #[serde(default)]
    pub payload: Value,
}

impl PushMessage {
    /// Create a message from an event name and payload.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Sub-stage of a single file's transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// A new file started.
    Start,
    /// Bytes arrived for the current file.
    Chunk,
    /// The current file finished.
    End,
}

/// Payload of `hf_download_progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Task the event belongs to.
    #[serde(rename = "model_id")]
    pub task_id: TaskId,
    /// Phase of the current file.
    pub phase: Phase,
    /// Current file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Bytes loaded for the current file (`chunk`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded: Option<u64>,
    /// Size of the current file (`chunk`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// 1-based position of the finished file (`end`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Number of files in the task (`end`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Size of the finished file (`end`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Rate the finished file was transferred at, in MB/s (`end`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mbps: Option<f64>,
}

impl ProgressEvent {
    /// Create an event with only the required fields set.
    pub fn new(task_id: impl Into<TaskId>, phase: Phase) -> Self {
        Self {
            task_id: task_id.into(),
            phase,
            file: None,
            loaded: None,
            total_bytes: None,
            index: None,
            total: None,
            size_bytes: None,
            speed_mbps: None,
        }
    }

    /// `start` for a file.
    pub fn start(task_id: impl Into<TaskId>, file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::new(task_id, Phase::Start)
        }
    }

    /// `chunk` with loaded/total bytes of the current file.
    pub fn chunk(
        task_id: impl Into<TaskId>,
        file: impl Into<String>,
        loaded: u64,
        total_bytes: u64,
    ) -> Self {
        Self {
            file: Some(file.into()),
            loaded: Some(loaded),
            total_bytes: Some(total_bytes),
            ..Self::new(task_id, Phase::Chunk)
        }
    }

    /// `end` for file `index` of `total`.
    pub fn end(
        task_id: impl Into<TaskId>,
        file: impl Into<String>,
        index: u32,
        total: u32,
        size_bytes: u64,
        speed_mbps: f64,
    ) -> Self {
        Self {
            file: Some(file.into()),
            index: Some(index),
            total: Some(total),
            size_bytes: Some(size_bytes),
            speed_mbps: Some(speed_mbps),
            ..Self::new(task_id, Phase::End)
        }
    }

    /// Label shown for the file this event refers to.
    #[must_use]
    pub fn detail_label(&self) -> Option<String> {
        self.file
            .as_ref()
            .map(|file| format!("{}/{file}", self.task_id))
    }
}

/// Payload of `hf_download_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteEvent {
    /// Task the event belongs to.
    #[serde(rename = "model_id")]
    pub task_id: TaskId,
    /// Final artifact location.
    pub path: String,
    /// Total bytes written.
    #[serde(default)]
    pub total_size_bytes: u64,
}

/// Decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Per-file phase update.
    Progress(ProgressEvent),
    /// Authoritative completion.
    Complete(CompleteEvent),
}

impl PushEvent {
    /// Task the event refers to.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Progress(e) => &e.task_id,
            Self::Complete(e) => &e.task_id,
        }
    }

    /// Decode a raw message.
    ///
    /// Returns `Ok(None)` for events this subsystem does not consume.
    pub fn decode(message: &PushMessage) -> Result<Option<Self>, PushDecodeError> {
        match message.event.as_str() {
            PROGRESS_EVENT => ProgressEvent::deserialize(&message.payload)
                .map(|e| Some(Self::Progress(e)))
                .map_err(|source| PushDecodeError::new(&message.event, &source)),
            COMPLETE_EVENT => CompleteEvent::deserialize(&message.payload)
                .map(|e| Some(Self::Complete(e)))
                .map_err(|source| PushDecodeError::new(&message.event, &source)),
            _ => Ok(None),
        }
    }
}

/// A push message whose payload could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed {event} payload: {reason}")]
pub struct PushDecodeError {
    /// Event name of the rejected message.
    pub event: String,
    /// Parser diagnostic.
    pub reason: String,
}

impl PushDecodeError {
    fn new(event: &str, source: &serde_json::Error) -> Self {
        Self {
            event: event.to_string(),
            reason: source.to_string(),
        }
    }
}
