//! WebSocket session management with reconnection.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use arielle_core::PushMessage;

use super::packet::{CONNECT_PACKET, Frame, PONG_PACKET, parse_frame};
use super::{PushChannelConfig, PushChannelError};

/// How a connected session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    ReceiverClosed,
}

/// Socket.IO client feeding push messages into a channel.
///
/// A disconnect never touches task state; delivery resumes after the next
/// successful reconnection.
#[derive(Debug, Clone)]
pub struct PushClient {
    config: PushChannelConfig,
}

impl PushClient {
    /// Create a client.
    pub const fn new(config: PushChannelConfig) -> Self {
        Self { config }
    }

    /// Client settings.
    pub const fn config(&self) -> &PushChannelConfig {
        &self.config
    }

    /// Run the client on a background task.
    pub fn spawn(
        self,
        tx: mpsc::Sender<PushMessage>,
        shutdown: CancellationToken,
    ) -> JoinHandle<Result<(), PushChannelError>> {
        tokio::spawn(async move { self.run(tx, shutdown).await })
    }

    /// Connect and forward messages until shutdown, receiver drop, or
    /// reconnection gives up.
    pub async fn run(
        &self,
        tx: mpsc::Sender<PushMessage>,
        shutdown: CancellationToken,
    ) -> Result<(), PushChannelError> {
        let mut failures = 0u32;
        loop {
            let connected = tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                result = connect_async(self.config.url.as_str()) => result,
            };

            let error = match connected {
                Ok((socket, _response)) => {
                    tracing::info!(target: "arielle.push", url = %self.config.url, "Push channel connected");
                    failures = 0;
                    match self.session(socket, &tx, &shutdown).await {
                        Ok(SessionEnd::Shutdown) => return Ok(()),
                        Ok(SessionEnd::ReceiverClosed) => {
                            tracing::debug!(target: "arielle.push", "Push receiver dropped, closing channel");
                            return Ok(());
                        }
                        Err(err) => err,
                    }
                }
                Err(err) => PushChannelError::Connect(err.to_string()),
            };

            failures += 1;
            if failures > self.config.reconnection_attempts {
                tracing::error!(
                    target: "arielle.push",
                    error = %error,
                    attempts = self.config.reconnection_attempts,
                    "Push channel giving up"
                );
                return Err(PushChannelError::Exhausted {
                    attempts: self.config.reconnection_attempts,
                });
            }

            tracing::warn!(
                target: "arielle.push",
                error = %error,
                attempt = failures,
                "Push channel disconnected, reconnecting"
            );
            tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                () = tokio::time::sleep(self.config.reconnection_delay) => {}
            }
        }
    }

    async fn session<S>(
        &self,
        socket: S,
        tx: &mpsc::Sender<PushMessage>,
        shutdown: &CancellationToken,
    ) -> Result<SessionEnd, PushChannelError>
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        let (mut sink, mut stream) = socket.split();

        loop {
            let next = tokio::select! {
                () = shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                next = stream.next() => next,
            };

            let text = match next {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => return Err(PushChannelError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(PushChannelError::Transport(err.to_string())),
            };

            match parse_frame(&text) {
                Ok(Frame::Open) => {
                    sink.send(Message::text(CONNECT_PACKET))
                        .await
                        .map_err(|err| PushChannelError::Transport(err.to_string()))?;
                }
                Ok(Frame::Ping) => {
                    sink.send(Message::text(PONG_PACKET))
                        .await
                        .map_err(|err| PushChannelError::Transport(err.to_string()))?;
                }
                Ok(Frame::Connected) => {
                    tracing::debug!(target: "arielle.push", url = %self.config.url, "Joined default namespace");
                }
                Ok(Frame::Event(message)) => {
                    if tx.send(message).await.is_err() {
                        return Ok(SessionEnd::ReceiverClosed);
                    }
                }
                Ok(Frame::Close | Frame::Disconnected) => return Err(PushChannelError::Closed),
                Ok(Frame::ConnectError(reason)) => {
                    return Err(PushChannelError::protocol(format!(
                        "namespace connect refused: {reason}"
                    )));
                }
                Ok(Frame::Noop) => {}
                Err(err) => {
                    tracing::debug!(target: "arielle.push", error = %err, "Ignoring malformed push frame");
                }
            }
        }
    }
}
