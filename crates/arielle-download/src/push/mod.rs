//! Push-channel client.
//!
//! Connects to the backend's Socket.IO endpoint over WebSocket, decodes event
//! frames into [`PushMessage`](arielle_core::PushMessage)s and forwards them to
//! an `mpsc` channel, typically the one handed to
//! [`DownloadCoordinator::init`](crate::DownloadCoordinator::init).

mod client;
mod packet;

use std::time::Duration;

use thiserror::Error;

pub use client::PushClient;
pub use packet::{CONNECT_PACKET, Frame, PONG_PACKET, parse_frame};

/// Default Socket.IO endpoint of the backend.
pub const DEFAULT_PUSH_URL: &str = "ws://localhost:8000/socket.io/?EIO=4&transport=websocket";

/// Errors raised by the push channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushChannelError {
    /// The WebSocket connection could not be established.
    #[error("Push channel connect failed: {0}")]
    Connect(String),

    /// The connection broke while open.
    #[error("Push channel transport error: {0}")]
    Transport(String),

    /// The server closed the connection or the namespace.
    #[error("Push channel closed by server")]
    Closed,

    /// A frame did not follow the protocol.
    #[error("Push channel protocol error: {0}")]
    Protocol(String),

    /// Reconnection gave up.
    #[error("Push channel gave up after {attempts} reconnection attempts")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },
}

impl PushChannelError {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Push channel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushChannelConfig {
    /// WebSocket URL of the Socket.IO endpoint.
    pub url: String,
    /// Reconnection attempts after a failure before giving up.
    pub reconnection_attempts: u32,
    /// Delay between reconnection attempts.
    pub reconnection_delay: Duration,
}

impl Default for PushChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PUSH_URL.to_string(),
            reconnection_attempts: 5,
            reconnection_delay: Duration::from_secs(1),
        }
    }
}

impl PushChannelConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the reconnection attempts.
    #[must_use]
    pub const fn with_reconnection_attempts(mut self, attempts: u32) -> Self {
        self.reconnection_attempts = attempts;
        self
    }

    /// Set the reconnection delay.
    #[must_use]
    pub const fn with_reconnection_delay(mut self, delay: Duration) -> Self {
        self.reconnection_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PushChannelConfig::default();
        assert_eq!(config.url, DEFAULT_PUSH_URL);
        assert_eq!(config.reconnection_attempts, 5);
        assert_eq!(config.reconnection_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_error_messages() {
        let err = PushChannelError::Exhausted { attempts: 5 };
        assert_eq!(
            err.to_string(),
            "Push channel gave up after 5 reconnection attempts"
        );
    }
}
