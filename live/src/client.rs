//! WebSocket-based live session client.
//!
//! The client owns the persistent streaming connection: it performs the
//! setup handshake, spawns read/write loop tasks, decodes inbound
//! envelopes into [`LiveEvent`]s on a channel, and applies the bounded
//! reconnect policy on unexpected closure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, warn};

use mkedev_audio::AudioFrame;

use crate::error::{LiveError, Result};
use crate::session::LiveSession;
use crate::types::{ConnectionState, Credential, CredentialKind, ReconnectPolicy, SetupConfig};
use crate::wire::{self, FunctionCallEvent, ServerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long to wait for the service to acknowledge setup.
const SETUP_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Event delivered to the session consumer.
#[derive(Debug)]
pub enum LiveEvent {
    /// Setup acknowledged; emitted once per successful (re)connection.
    SetupComplete,
    /// A chunk of response text.
    TextDelta(String),
    /// A chunk of response audio (24 kHz PCM).
    AudioDelta(AudioFrame),
    /// A batch of function calls; the consumer must answer every one.
    FunctionCalls(Vec<FunctionCallEvent>),
    /// The model finished its turn.
    TurnComplete,
    /// The connection closed for good (after any reconnect attempts).
    Closed { unexpected: bool },
    /// A terminal error; the client is in the `Error` state.
    Error(LiveError),
}

struct Inner {
    endpoint: String,
    setup: SetupConfig,
    policy: ReconnectPolicy,
    state: Mutex<ConnectionState>,
    write_tx: Mutex<Option<mpsc::Sender<Message>>>,
    event_tx: mpsc::Sender<LiveEvent>,
    local_close: AtomicBool,
}

/// Live session client over a WebSocket transport.
pub struct LiveClient {
    inner: Arc<Inner>,
    event_rx: Mutex<Option<mpsc::Receiver<LiveEvent>>>,
}

impl LiveClient {
    /// Creates a client for the default endpoint with the default
    /// reconnect policy.
    pub fn new(setup: SetupConfig) -> Self {
        Self::with_endpoint(setup, crate::types::DEFAULT_ENDPOINT)
    }

    /// Creates a client against a specific endpoint URL.
    pub fn with_endpoint(setup: SetupConfig, endpoint: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(100);
        Self {
            inner: Arc::new(Inner {
                endpoint: endpoint.into(),
                setup,
                policy: ReconnectPolicy::default(),
                state: Mutex::new(ConnectionState::Disconnected),
                write_tx: Mutex::new(None),
                event_tx,
                local_close: AtomicBool::new(false),
            }),
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Overrides the reconnect policy.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_policy must be called before connect")
            .policy = policy;
        self
    }

    /// Takes the event receiver. Yields `None` after the first call.
    pub fn take_events(&self) -> Option<mpsc::Receiver<LiveEvent>> {
        self.event_rx.lock().take()
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Opens the connection, sends the setup envelope, and resolves once
    /// the service acknowledges it. The credential lives only in memory
    /// for the duration of the connection.
    ///
    /// Only one connection may be in flight per client.
    pub async fn connect(&self, credential: Credential) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            match *state {
                ConnectionState::Disconnected | ConnectionState::Error => {
                    *state = ConnectionState::Connecting;
                }
                _ => return Err(LiveError::AlreadyConnected),
            }
        }
        self.inner.local_close.store(false, Ordering::SeqCst);

        match establish(&self.inner, &credential).await {
            Ok(source) => {
                *self.inner.state.lock() = ConnectionState::Connected;
                let _ = self.inner.event_tx.send(LiveEvent::SetupComplete).await;
                tokio::spawn(supervise(self.inner.clone(), source, credential));
                Ok(())
            }
            Err(e) => {
                *self.inner.state.lock() = ConnectionState::Error;
                Err(e)
            }
        }
    }

    /// Closes the connection with a normal-closure code. Idempotent.
    pub async fn disconnect(&self) {
        self.inner.local_close.store(true, Ordering::SeqCst);
        let tx = self.inner.write_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(Message::Close(None)).await;
        }
        let mut state = self.inner.state.lock();
        if *state != ConnectionState::Error {
            *state = ConnectionState::Disconnected;
        }
    }

    async fn send_envelope(&self, envelope: Value) -> Result<()> {
        if *self.inner.state.lock() != ConnectionState::Connected {
            warn!("not connected, dropping outbound message");
            return Ok(());
        }
        let tx = self.inner.write_tx.lock().clone();
        match tx {
            Some(tx) => {
                if tx
                    .send(Message::Text(envelope.to_string().into()))
                    .await
                    .is_err()
                {
                    warn!("write loop gone, dropping outbound message");
                }
                Ok(())
            }
            None => {
                warn!("no open socket, dropping outbound message");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LiveSession for LiveClient {
    async fn send_audio(&self, frame: &AudioFrame) -> Result<()> {
        self.send_envelope(wire::encode_audio_chunk(frame)).await
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.send_envelope(wire::encode_text_turn(text, true)).await
    }

    async fn send_function_result(
        &self,
        call_id: &str,
        name: &str,
        result: &Value,
    ) -> Result<()> {
        self.send_envelope(wire::encode_function_result(call_id, name, result))
            .await
    }

    async fn close(&self) -> Result<()> {
        self.disconnect().await;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        LiveClient::state(self)
    }
}

// ============================================================================
// Connection establishment
// ============================================================================

/// Opens the socket, sends setup, and waits for the acknowledgment.
/// On success the write loop is running and `Inner::write_tx` is fresh.
async fn establish(inner: &Arc<Inner>, credential: &Credential) -> Result<WsSource> {
    let url = match credential.kind() {
        CredentialKind::LongLived => format!("{}?key={}", inner.endpoint, credential.token()),
        CredentialKind::Ephemeral => {
            format!("{}?access_token={}", inner.endpoint, credential.token())
        }
    };

    let request = http::Request::builder()
        .uri(&url)
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Key", generate_websocket_key())
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header(
            "Host",
            extract_host(&url).unwrap_or("generativelanguage.googleapis.com"),
        )
        .body(())
        .map_err(|e| LiveError::Connection(format!("failed to build request: {e}")))?;

    let (ws_stream, _response) = connect_async(request)
        .await
        .map_err(|e| LiveError::Connection(format!("failed to connect: {e}")))?;

    let (sink, mut source) = ws_stream.split();

    let (write_tx, write_rx) = mpsc::channel(100);
    tokio::spawn(write_loop(sink, write_rx));

    let setup = wire::encode_setup(&inner.setup);
    write_tx
        .send(Message::Text(setup.to_string().into()))
        .await
        .map_err(|_| LiveError::SessionClosed)?;

    timeout(SETUP_ACK_TIMEOUT, wait_for_ack(&mut source))
        .await
        .map_err(|_| LiveError::Timeout("setup was not acknowledged".into()))??;

    *inner.write_tx.lock() = Some(write_tx);
    Ok(source)
}

async fn wait_for_ack(source: &mut WsSource) -> Result<()> {
    while let Some(result) = source.next().await {
        match result {
            Ok(Message::Text(text)) => match wire::decode(&text) {
                Ok(ServerEvent::SetupComplete) => return Ok(()),
                Ok(other) => debug!("ignoring pre-ack event: {:?}", other),
                Err(e) => debug!("dropping undecodable pre-ack message: {}", e),
            },
            Ok(Message::Close(frame)) => {
                return Err(LiveError::Connection(format!(
                    "closed before setup ack: {frame:?}"
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(LiveError::WebSocket(e)),
        }
    }
    Err(LiveError::Connection("closed before setup ack".into()))
}

// ============================================================================
// Read/write loops
// ============================================================================

async fn write_loop(mut sink: WsSink, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Message::Close(_) = msg {
            let _ = sink.close().await;
            break;
        }
        if let Err(e) = sink.send(msg).await {
            error!("write error: {}", e);
            break;
        }
    }
}

enum CloseKind {
    Expected,
    Unexpected(LiveError),
}

/// Forwards decoded events until the connection ends, classifying the
/// closure.
async fn pump(inner: &Arc<Inner>, source: &mut WsSource) -> CloseKind {
    while let Some(result) = source.next().await {
        match result {
            Ok(Message::Text(text)) => forward_decoded(inner, &text).await,
            Ok(Message::Binary(data)) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                forward_decoded(inner, &text).await;
            }
            Ok(Message::Close(frame)) => {
                if inner.local_close.load(Ordering::SeqCst) {
                    return CloseKind::Expected;
                }
                let normal = frame
                    .as_ref()
                    .map(|f| f.code == CloseCode::Normal)
                    .unwrap_or(false);
                if normal {
                    return CloseKind::Expected;
                }
                return CloseKind::Unexpected(LiveError::Connection(format!(
                    "unexpected close: {frame:?}"
                )));
            }
            Ok(Message::Ping(_)) => debug!("received ping"),
            Ok(_) => {}
            Err(e) => {
                if inner.local_close.load(Ordering::SeqCst) {
                    return CloseKind::Expected;
                }
                return CloseKind::Unexpected(LiveError::WebSocket(e));
            }
        }
    }
    if inner.local_close.load(Ordering::SeqCst) {
        CloseKind::Expected
    } else {
        CloseKind::Unexpected(LiveError::Connection("connection dropped".into()))
    }
}

async fn forward_decoded(inner: &Arc<Inner>, text: &str) {
    match wire::decode(text) {
        Ok(event) => {
            let event = match event {
                ServerEvent::SetupComplete => LiveEvent::SetupComplete,
                ServerEvent::TextDelta(t) => LiveEvent::TextDelta(t),
                ServerEvent::AudioDelta(f) => LiveEvent::AudioDelta(f),
                ServerEvent::FunctionCalls(b) => LiveEvent::FunctionCalls(b),
                ServerEvent::TurnComplete => LiveEvent::TurnComplete,
            };
            let _ = inner.event_tx.send(event).await;
        }
        // A malformed message costs itself, not the session.
        Err(e) => debug!("dropping undecodable message: {}", e),
    }
}

// ============================================================================
// Reconnect supervision
// ============================================================================

async fn supervise(inner: Arc<Inner>, mut source: WsSource, credential: Credential) {
    let mut attempts: u32 = 0;
    loop {
        let outcome = pump(&inner, &mut source).await;
        let last_error = match outcome {
            CloseKind::Expected => {
                finish_disconnected(&inner).await;
                return;
            }
            CloseKind::Unexpected(e) => e,
        };

        if credential.kind() == CredentialKind::Ephemeral {
            debug!("ephemeral credential consumed, not reconnecting");
            fail(&inner, last_error).await;
            return;
        }

        *inner.state.lock() = ConnectionState::Connecting;
        inner.write_tx.lock().take();

        let mut reconnect_error = last_error;
        let mut reconnected = false;
        while attempts < inner.policy.max_attempts {
            attempts += 1;
            tokio::time::sleep(inner.policy.delay).await;
            if inner.local_close.load(Ordering::SeqCst) {
                finish_disconnected(&inner).await;
                return;
            }
            debug!("reconnect attempt {}/{}", attempts, inner.policy.max_attempts);
            match establish(&inner, &credential).await {
                Ok(new_source) => {
                    source = new_source;
                    *inner.state.lock() = ConnectionState::Connected;
                    let _ = inner.event_tx.send(LiveEvent::SetupComplete).await;
                    reconnected = true;
                    break;
                }
                Err(e) => {
                    warn!("reconnect attempt {} failed: {}", attempts, e);
                    reconnect_error = e;
                }
            }
        }
        if !reconnected {
            fail(&inner, reconnect_error).await;
            return;
        }
    }
}

async fn finish_disconnected(inner: &Arc<Inner>) {
    {
        let mut state = inner.state.lock();
        if *state != ConnectionState::Error {
            *state = ConnectionState::Disconnected;
        }
    }
    inner.write_tx.lock().take();
    let _ = inner
        .event_tx
        .send(LiveEvent::Closed { unexpected: false })
        .await;
}

async fn fail(inner: &Arc<Inner>, last_error: LiveError) {
    *inner.state.lock() = ConnectionState::Error;
    inner.write_tx.lock().take();
    let _ = inner.event_tx.send(LiveEvent::Error(last_error)).await;
    let _ = inner
        .event_tx
        .send(LiveEvent::Closed { unexpected: true })
        .await;
}

// ============================================================================
// Helpers
// ============================================================================

fn generate_websocket_key() -> String {
    use base64::Engine;
    let nonce = uuid::Uuid::new_v4();
    base64::engine::general_purpose::STANDARD.encode(nonce.as_bytes())
}

fn extract_host(url: &str) -> Option<&str> {
    url.strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"))
        .and_then(|s| s.split('/').next())
        .and_then(|s| s.split('?').next())
}
