//! Socket.IO (Engine.IO v4) text frame parsing.
//!
//! Only the subset the backend uses is understood:
//!
//! ```text
//! 0{...}              engine open          -> reply "40"
//! 1                   engine close
//! 2 / 3               ping / pong          -> reply "3" to a ping
//! 6                   noop
//! 40{...}             namespace connected
//! 41                  namespace disconnect
//! 42[event, data]     event (optionally "42/nsp,<ack>[...]")
//! 44{...}             connect error
//! {"event", "data"}   plain JSON frame
//! ```

use serde_json::Value;

use arielle_core::PushMessage;

use super::PushChannelError;

/// Reply sent after the engine handshake to join the default namespace.
pub const CONNECT_PACKET: &str = "40";

/// Reply to an engine ping.
pub const PONG_PACKET: &str = "3";

/// One parsed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine handshake; the client must join the namespace.
    Open,
    /// Engine close.
    Close,
    /// Engine ping; the client must answer with a pong.
    Ping,
    /// Engine pong or noop.
    Noop,
    /// Namespace joined.
    Connected,
    /// Namespace left by the server.
    Disconnected,
    /// Namespace join refused.
    ConnectError(String),
    /// Named event.
    Event(PushMessage),
}

/// Parse one text frame.
pub fn parse_frame(text: &str) -> Result<Frame, PushChannelError> {
    let text = text.trim();
    if text.starts_with('{') {
        return parse_plain(text);
    }

    let mut chars = text.chars();
    let Some(engine) = chars.next() else {
        return Err(PushChannelError::protocol("empty frame"));
    };
    let rest = chars.as_str();

    match engine {
        '0' => Ok(Frame::Open),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' | '6' => Ok(Frame::Noop),
        '4' => parse_socket(rest),
        other => Err(PushChannelError::protocol(format!(
            "unsupported engine packet type '{other}'"
        ))),
    }
}

fn parse_socket(packet: &str) -> Result<Frame, PushChannelError> {
    let mut chars = packet.chars();
    let kind = chars
        .next()
        .ok_or_else(|| PushChannelError::protocol("missing socket packet type"))?;
    let body = strip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => parse_event(body.trim_start_matches(|c: char| c.is_ascii_digit())),
        '4' => Ok(Frame::ConnectError(body.to_string())),
        // acks and binary packets are never sent by the backend
        _ => Ok(Frame::Noop),
    }
}

/// Drop a leading `/namespace,` prefix.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn parse_event(payload: &str) -> Result<Frame, PushChannelError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| PushChannelError::protocol(format!("invalid event payload: {err}")))?;
    let Value::Array(mut items) = value else {
        return Err(PushChannelError::protocol("event payload is not an array"));
    };
    if items.is_empty() {
        return Err(PushChannelError::protocol("event payload is empty"));
    }
    let Value::String(event) = items.remove(0) else {
        return Err(PushChannelError::protocol("event name is not a string"));
    };
    let payload = if items.is_empty() {
        Value::Null
    } else {
        items.remove(0)
    };
    Ok(Frame::Event(PushMessage::new(event, payload)))
}

fn parse_plain(text: &str) -> Result<Frame, PushChannelError> {
    #[derive(serde::Deserialize)]
    struct Plain {
        event: String,
        #[serde(default)]
        data: Value,
    }

    let plain: Plain = serde_json::from_str(text)
        .map_err(|err| PushChannelError::protocol(format!("invalid JSON frame: {err}")))?;
    Ok(Frame::Event(PushMessage::new(plain.event, plain.data)))
}
