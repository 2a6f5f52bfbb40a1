//! Notification sink adapters.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use arielle_core::{Notification, NotifierPort, Variant};

/// Window within which a repeated key is suppressed.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(1500);

/// Logs notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotifierPort for TracingNotifier {
    fn notify(&self, n: Notification) {
        let title = n.title.as_deref().unwrap_or_default();
        let action = n.action.as_ref().map(|a| a.target.as_str());
        match n.variant {
            Variant::Info | Variant::Success => {
                tracing::info!(target: "arielle.notify", key = %n.key, title, action, "{}", n.description);
            }
            Variant::Warning => {
                tracing::warn!(target: "arielle.notify", key = %n.key, title, action, "{}", n.description);
            }
            Variant::Error => {
                tracing::error!(target: "arielle.notify", key = %n.key, title, action, "{}", n.description);
            }
        }
    }
}

/// Suppresses a notification whose key was delivered within the window.
#[derive(Debug)]
pub struct DedupNotifier<N> {
    inner: N,
    window: Duration,
    recent: Mutex<HashMap<String, Instant>>,
}

impl<N: NotifierPort> DedupNotifier<N> {
    /// Wrap `inner` with the default window.
    pub fn new(inner: N) -> Self {
        Self::with_window(inner, DEFAULT_DEDUP_WINDOW)
    }

    /// Wrap `inner` with a custom window.
    pub fn with_window(inner: N, window: Duration) -> Self {
        Self {
            inner,
            window,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped sink.
    pub const fn inner(&self) -> &N {
        &self.inner
    }

    fn admit(&self, key: &str, now: Instant) -> bool {
        let mut recent = self.recent.lock();
        recent.retain(|_, at| now.duration_since(*at) < self.window);
        if recent.contains_key(key) {
            return false;
        }
        recent.insert(key.to_string(), now);
        true
    }
}

impl<N: NotifierPort> NotifierPort for DedupNotifier<N> {
    fn notify(&self, notification: Notification) {
        if self.admit(&notification.key, Instant::now()) {
            self.inner.notify(notification);
        } else {
            tracing::debug!(target: "arielle.notify", key = %notification.key, "Suppressed duplicate notification");
        }
    }
}
