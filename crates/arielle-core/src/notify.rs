//! User-facing notifications for task lifecycle events.
//!
//! Every notification carries a stable `key` of the form `{kind}-{task id}` so
//! a sink can collapse repeats of the same event.

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Default location of the credential settings surface.
pub const DEFAULT_SETTINGS_URL: &str = "/settings/huggingface";

/// Visual severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Neutral status update.
    Info,
    /// Something finished well.
    Success,
    /// Needs the user's attention, usually with an action.
    Warning,
    /// Something failed.
    Error,
}

/// Optional call to action attached to a notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Button label.
    pub text: String,
    /// Navigation target.
    pub target: String,
}

/// A user-facing message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Deduplication key.
    pub key: String,
    /// Short heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Message body.
    pub description: String,
    /// Severity.
    pub variant: Variant,
    /// Call to action, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<NotificationAction>,
}

impl Notification {
    fn keyed(kind: &str, id: &TaskId, variant: Variant, title: &str, description: String) -> Self {
        Self {
            key: format!("{kind}-{id}"),
            title: Some(title.to_string()),
            description,
            variant,
            action: None,
        }
    }

    /// The task reached `done`.
    #[must_use]
    pub fn completed(id: &TaskId, display_name: &str) -> Self {
        Self::keyed(
            "done",
            id,
            Variant::Success,
            "Download complete",
            format!("\"{display_name}\" finished downloading."),
        )
    }

    /// The task failed for a non-authorization reason.
    #[must_use]
    pub fn failed(id: &TaskId, message: &str) -> Self {
        let description = if message.trim().is_empty() {
            "An unknown error occurred.".to_string()
        } else {
            message.to_string()
        };
        Self::keyed("err", id, Variant::Error, "Download failed", description)
    }

    /// The task was cancelled.
    #[must_use]
    pub fn canceled(id: &TaskId, display_name: &str) -> Self {
        Self::keyed(
            "cancel",
            id,
            Variant::Info,
            "Canceled",
            format!("\"{display_name}\" download was canceled."),
        )
    }

    /// Authorization is required and no credential is stored.
    #[must_use]
    pub fn credential_missing(id: &TaskId, settings_url: &str) -> Self {
        Self::keyed(
            "auth",
            id,
            Variant::Warning,
            "Authentication required",
            "This model requires access. Configure a Hugging Face token.".to_string(),
        )
        .with_settings_action(settings_url)
    }

    /// Authorization still failed with the stored credential.
    #[must_use]
    pub fn credential_rejected(id: &TaskId, settings_url: &str) -> Self {
        Self::keyed(
            "authfail",
            id,
            Variant::Error,
            "Permission check failed",
            "The token may lack permission or have expired. Check it and try again.".to_string(),
        )
        .with_settings_action(settings_url)
    }

    /// A task with this id is already running.
    #[must_use]
    pub fn duplicate(id: &TaskId, display_name: &str) -> Self {
        Self::keyed(
            "dup",
            id,
            Variant::Info,
            "Already in progress",
            format!("\"{display_name}\" is already downloading."),
        )
    }

    fn with_settings_action(mut self, settings_url: &str) -> Self {
        self.action = Some(NotificationAction {
            text: "Configure token".to_string(),
            target: settings_url.to_string(),
        });
        self
    }
}
