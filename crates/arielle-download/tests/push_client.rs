//! Integration tests for `PushClient` against a local WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_util::sync::CancellationToken;

use arielle_download::{PushChannelConfig, PushChannelError, PushClient};

const WAIT: Duration = Duration::from_secs(5);

const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

const PROGRESS: &str = r#"42["hf_download_progress",{"model_id":"m1","phase":"chunk","file":"a.bin","loaded":5,"total_bytes":10}]"#;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (
        listener,
        format!("ws://{addr}/socket.io/?EIO=4&transport=websocket"),
    )
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text.to_string(),
            Some(Ok(_)) => {}
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Engine open, then expect the namespace join.
async fn handshake(ws: &mut WebSocketStream<TcpStream>) {
    ws.send(Message::text(OPEN)).await.unwrap();
    assert_eq!(next_text(ws).await, "40");
    ws.send(Message::text(r#"40{"sid":"n1"}"#)).await.unwrap();
}

fn config(url: String) -> PushChannelConfig {
    PushChannelConfig::new()
        .with_url(url)
        .with_reconnection_attempts(2)
        .with_reconnection_delay(Duration::from_millis(10))
}

#[tokio::test]
async fn forwards_events_and_answers_pings() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws).await;
        ws.send(Message::text("2")).await.unwrap();
        let pong = next_text(&mut ws).await;
        ws.send(Message::text(PROGRESS)).await.unwrap();
        // Keep the socket open until the client leaves.
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                break;
            }
        }
        pong
    });

    let (tx, mut rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let client = PushClient::new(config(url)).spawn(tx, shutdown.clone());

    let message = tokio::time::timeout(WAIT, rx.recv())
        .await
        .unwrap()
        .expect("event forwarded");
    assert_eq!(message.event, "hf_download_progress");
    assert_eq!(message.payload["model_id"], "m1");
    assert_eq!(message.payload["loaded"], 5);

    shutdown.cancel();
    assert_eq!(tokio::time::timeout(WAIT, client).await.unwrap().unwrap(), Ok(()));
    assert_eq!(tokio::time::timeout(WAIT, server).await.unwrap().unwrap(), "3");
}

#[tokio::test]
async fn reconnects_after_server_close() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        handshake(&mut first).await;
        first.close(None).await.unwrap();

        let mut second = accept(&listener).await;
        handshake(&mut second).await;
        second
            .send(Message::text(
                r#"42["hf_download_complete",{"model_id":"m1","path":"/srv/m1"}]"#,
            ))
            .await
            .unwrap();
        while let Some(Ok(message)) = second.next().await {
            if message.is_close() {
                break;
            }
        }
    });

    let (tx, mut rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let client = PushClient::new(config(url)).spawn(tx, shutdown.clone());

    let message = tokio::time::timeout(WAIT, rx.recv())
        .await
        .unwrap()
        .expect("event forwarded after reconnect");
    assert_eq!(message.event, "hf_download_complete");
    assert_eq!(message.payload["path"], "/srv/m1");

    shutdown.cancel();
    assert_eq!(tokio::time::timeout(WAIT, client).await.unwrap().unwrap(), Ok(()));
    tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn gives_up_after_reconnection_attempts() {
    let (listener, url) = bind().await;
    drop(listener);

    let (tx, _rx) = mpsc::channel(8);
    let client = PushClient::new(config(url).with_reconnection_attempts(1));
    let result = tokio::time::timeout(WAIT, client.run(tx, CancellationToken::new()))
        .await
        .unwrap();
    assert_eq!(result, Err(PushChannelError::Exhausted { attempts: 1 }));
}

#[tokio::test]
async fn stops_when_receiver_is_dropped() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws).await;
        ws.send(Message::text(PROGRESS)).await.unwrap();
    });

    let (tx, rx) = mpsc::channel(8);
    drop(rx);
    let client = PushClient::new(config(url));
    let result = tokio::time::timeout(WAIT, client.run(tx, CancellationToken::new()))
        .await
        .unwrap();
    assert_eq!(result, Ok(()));
    tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
}
