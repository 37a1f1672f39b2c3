//! Session client contract tests against an in-process WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use mkedev_live::{
    ConnectionState, Credential, LiveClient, LiveEvent, LiveSession, ReconnectPolicy, SetupConfig,
};

/// What the loopback server does with each accepted connection after
/// acknowledging setup.
#[derive(Clone, Copy)]
enum ConnScript {
    /// Send a text delta and turn completion, then close normally.
    TalkThenClose,
    /// Drop the TCP stream without a closing handshake.
    DropAbruptly,
    /// Stay open until the client closes.
    StayOpen,
}

/// Starts a server that runs `script` for every connection and returns
/// its ws:// endpoint plus a counter of accepted connections.
async fn spawn_server(script: ConnScript) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/v1/live", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut ws = match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => return,
                };
                // First inbound message is the setup envelope.
                let setup = ws.next().await;
                assert!(matches!(setup, Some(Ok(Message::Text(ref text))) if text.contains("\"setup\"")));
                ws.send(Message::Text(r#"{"setupComplete": {}}"#.into()))
                    .await
                    .unwrap();

                match script {
                    ConnScript::TalkThenClose => {
                        ws.send(Message::Text(
                            r#"{"serverContent": {"modelTurn": {"parts": [{"text": "hello"}]}}}"#
                                .into(),
                        ))
                        .await
                        .unwrap();
                        ws.send(Message::Text(
                            r#"{"serverContent": {"turnComplete": true}}"#.into(),
                        ))
                        .await
                        .unwrap();
                        let _ = ws
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "done".into(),
                            })))
                            .await;
                    }
                    ConnScript::DropAbruptly => {
                        // Dropping `ws` resets the connection with no
                        // closing handshake.
                    }
                    ConnScript::StayOpen => {
                        while let Some(msg) = ws.next().await {
                            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    (endpoint, accepted)
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(20),
    }
}

async fn recv_event(rx: &mut mpsc::Receiver<LiveEvent>) -> LiveEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_connect_handshake_and_events() {
    let (endpoint, accepted) = spawn_server(ConnScript::TalkThenClose).await;
    let client = LiveClient::with_endpoint(SetupConfig::default(), &endpoint);
    let mut events = client.take_events().unwrap();

    client
        .connect(Credential::long_lived("test-key"))
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    assert!(matches!(recv_event(&mut events).await, LiveEvent::SetupComplete));
    match recv_event(&mut events).await {
        LiveEvent::TextDelta(text) => assert_eq!(text, "hello"),
        other => panic!("expected text delta, got {other:?}"),
    }
    assert!(matches!(recv_event(&mut events).await, LiveEvent::TurnComplete));
    assert!(matches!(
        recv_event(&mut events).await,
        LiveEvent::Closed { unexpected: false }
    ));

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_second_connect_rejected_while_open() {
    let (endpoint, _accepted) = spawn_server(ConnScript::StayOpen).await;
    let client = LiveClient::with_endpoint(SetupConfig::default(), &endpoint);
    let _events = client.take_events().unwrap();

    client
        .connect(Credential::long_lived("test-key"))
        .await
        .unwrap();
    assert!(
        client
            .connect(Credential::long_lived("test-key"))
            .await
            .is_err()
    );
    client.disconnect().await;
}

#[tokio::test]
async fn test_sends_are_noops_when_disconnected() {
    let client = LiveClient::new(SetupConfig::default());
    // Never connected: sends warn and succeed without a connection.
    client.send_text("anyone there?").await.unwrap();
    client
        .send_function_result("c1", "reset_map_view", &serde_json::json!({"success": true}))
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_bound_long_lived() {
    let (endpoint, accepted) = spawn_server(ConnScript::DropAbruptly).await;
    let client =
        LiveClient::with_endpoint(SetupConfig::default(), &endpoint).with_policy(fast_policy());
    let mut events = client.take_events().unwrap();

    client
        .connect(Credential::long_lived("test-key"))
        .await
        .unwrap();

    // Every connection is dropped unexpectedly: expect the initial
    // connection plus exactly 3 reconnect attempts, then a terminal
    // error.
    let mut errors = 0;
    let mut setup_acks = 0;
    loop {
        match recv_event(&mut events).await {
            LiveEvent::SetupComplete => setup_acks += 1,
            LiveEvent::Error(_) => errors += 1,
            LiveEvent::Closed { unexpected } => {
                assert!(unexpected);
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert_eq!(setup_acks, 4);
    assert_eq!(errors, 1);
    assert_eq!(accepted.load(Ordering::SeqCst), 4);
    assert_eq!(client.state(), ConnectionState::Error);
}

#[tokio::test]
async fn test_ephemeral_credential_never_reconnects() {
    let (endpoint, accepted) = spawn_server(ConnScript::DropAbruptly).await;
    let client =
        LiveClient::with_endpoint(SetupConfig::default(), &endpoint).with_policy(fast_policy());
    let mut events = client.take_events().unwrap();

    client
        .connect(Credential::ephemeral("single-use-token"))
        .await
        .unwrap();

    assert!(matches!(recv_event(&mut events).await, LiveEvent::SetupComplete));
    assert!(matches!(recv_event(&mut events).await, LiveEvent::Error(_)));
    assert!(matches!(
        recv_event(&mut events).await,
        LiveEvent::Closed { unexpected: true }
    ));

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Error);
}

#[tokio::test]
async fn test_disconnect_is_idempotent_and_expected() {
    let (endpoint, accepted) = spawn_server(ConnScript::StayOpen).await;
    let client =
        LiveClient::with_endpoint(SetupConfig::default(), &endpoint).with_policy(fast_policy());
    let mut events = client.take_events().unwrap();

    client
        .connect(Credential::long_lived("test-key"))
        .await
        .unwrap();
    assert!(matches!(recv_event(&mut events).await, LiveEvent::SetupComplete));

    client.disconnect().await;
    client.disconnect().await;

    assert!(matches!(
        recv_event(&mut events).await,
        LiveEvent::Closed { unexpected: false }
    ));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
