//! HTTP adapters for the model backend.
//!
//! ```text
//! POST {base}/api/models/download-model   { "model_id": ... }  -> { "path": ... }
//! POST {base}/api/models/cancel-download  { "model_id": ... }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use arielle_core::{RemoteCancelError, RemoteCancelPort, TaskId, TransferError};

use crate::transfer::{TransferContext, TransferOperation};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

const DOWNLOAD_PATH: &str = "/api/models/download-model";
const CANCEL_PATH: &str = "/api/models/cancel-download";

/// Backend connection settings.
///
/// # Example
///
/// ```
/// use arielle_download::BackendConfig;
/// use std::time::Duration;
///
/// let config = BackendConfig::new()
///     .with_base_url("http://127.0.0.1:9000")
///     .with_cancel_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Connect timeout for all requests.
    pub connect_timeout: Duration,
    /// Overall timeout for cancel requests. Downloads have none.
    pub cancel_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            user_agent: concat!("arielle/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            cancel_timeout: Duration::from_secs(10),
        }
    }
}

impl BackendConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the cancel request timeout.
    #[must_use]
    pub const fn with_cancel_timeout(mut self, timeout: Duration) -> Self {
        self.cancel_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn build_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(target: "arielle.http", error = %err, "Falling back to default HTTP client");
                reqwest::Client::new()
            })
    }
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    path: String,
}

/// Downloads a model through the backend.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpTransfer {
    /// Create a transfer against `config`.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: config.build_client(),
            config,
        }
    }

    fn cancelled() -> TransferError {
        TransferError::cancelled("request aborted")
    }
}

#[async_trait]
impl TransferOperation for HttpTransfer {
    async fn run(&self, ctx: TransferContext) -> Result<String, TransferError> {
        let mut request = self
            .client
            .post(self.config.endpoint(DOWNLOAD_PATH))
            .json(&ModelRequest {
                model_id: ctx.id().as_str(),
            });
        if let Some(token) = ctx.token() {
            request = request.bearer_auth(token);
        }

        let response = tokio::select! {
            () = ctx.cancelled() => return Err(Self::cancelled()),
            response = request.send() => response.map_err(transport_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("request failed");
            return Err(TransferError::status(
                status.as_u16(),
                error_message(&body).unwrap_or_else(|| reason.to_string()),
            ));
        }

        let length = response.content_length().filter(|len| *len > 0);
        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        loop {
            tokio::select! {
                () = ctx.cancelled() => return Err(Self::cancelled()),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                        let loaded = body.len() as u64;
                        ctx.report(loaded, length.unwrap_or(loaded));
                    }
                    Some(Err(err)) => return Err(transport_error(err)),
                    None => break,
                },
            }
        }

        let parsed: DownloadResponse = serde_json::from_slice(&body)
            .map_err(|err| TransferError::other(format!("Invalid download response: {err}")))?;
        tracing::debug!(target: "arielle.http", id = %ctx.id(), path = %parsed.path, "Backend reported artifact");
        Ok(parsed.path)
    }
}

/// Sends cancel requests to the backend.
#[derive(Debug, Clone)]
pub struct HttpRemoteCancel {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpRemoteCancel {
    /// Create a canceller against `config`.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: config.build_client(),
            config,
        }
    }
}

#[async_trait]
impl RemoteCancelPort for HttpRemoteCancel {
    async fn cancel_remote(&self, id: &TaskId) -> Result<(), RemoteCancelError> {
        let response = self
            .client
            .post(self.config.endpoint(CANCEL_PATH))
            .timeout(self.config.cancel_timeout)
            .json(&ModelRequest {
                model_id: id.as_str(),
            })
            .send()
            .await
            .map_err(|err| RemoteCancelError::Unreachable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RemoteCancelError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

fn transport_error(err: reqwest::Error) -> TransferError {
    TransferError::transport(err.status().map(|s| s.as_u16()), err.to_string())
}

/// Pull a human-readable message out of an error body.
///
/// Looks for `message`, `error` or `detail` string fields in a JSON object,
/// then falls back to the raw text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        return ["message", "error", "detail"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(ToString::to_string);
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_builder() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, DEFAULT_BACKEND_URL);
        assert!(config.user_agent.starts_with("arielle/"));

        let config = BackendConfig::new().with_base_url("http://127.0.0.1:9000/");
        assert_eq!(
            config.endpoint(DOWNLOAD_PATH),
            "http://127.0.0.1:9000/api/models/download-model"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message": "Repository is private"}"#).as_deref(),
            Some("Repository is private")
        );
        assert_eq!(
            error_message(r#"{"error": "Unauthorized"}"#).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(
            error_message(r#"{"detail": "not found"}"#).as_deref(),
            Some("not found")
        );
        assert_eq!(error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message("  "), None);
        assert_eq!(error_message(r#"{"code": 7}"#), None);
    }
}
