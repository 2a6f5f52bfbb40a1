//! Coordinator configuration.

use crate::notify::DEFAULT_SETTINGS_URL;

/// Reason attached to the abort signal of a user cancellation.
pub const DEFAULT_CANCEL_REASON: &str = "canceled by user";

/// Settings that shape coordinator behavior but not its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Target of the "configure token" action on credential notifications.
    pub settings_url: String,
    /// Reason passed to the cancellation handle on `cancel`.
    pub cancel_reason: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            settings_url: DEFAULT_SETTINGS_URL.to_string(),
            cancel_reason: DEFAULT_CANCEL_REASON.to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credential settings target.
    #[must_use]
    pub fn with_settings_url(mut self, url: impl Into<String>) -> Self {
        self.settings_url = url.into();
        self
    }

    /// Set the cancellation reason.
    #[must_use]
    pub fn with_cancel_reason(mut self, reason: impl Into<String>) -> Self {
        self.cancel_reason = reason.into();
        self
    }
}
