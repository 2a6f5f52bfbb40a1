//! Notification sink port.

use crate::notify::Notification;

/// Sink for user-facing notifications.
///
/// Implementations must not block; delivery is fire-and-forget.
#[cfg_attr(test, mockall::automock)]
pub trait NotifierPort: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification);
}

/// A notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotifierPort for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}
