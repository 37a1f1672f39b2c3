//! The session orchestrator.
//!
//! Coordinates the audio adapter, the live client, and the dispatch
//! table behind the state machine the host application sees. All shared
//! session state is mutated from one pump task per session, so event
//! handling is serialized without locks beyond the short state guards.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mkedev_audio::{AudioFrame, Player, Recorder};
use mkedev_live::{
    Credential, FunctionDecl, LiveClient, LiveEvent, LiveSession, Modality, ReconnectPolicy,
    SetupConfig, VOICE_AOEDE,
};
use mkedev_tools::{Card, ToolRegistry};

use crate::credentials::CredentialProvider;
use crate::error::{AgentError, Result};
use crate::state::VoiceState;
use crate::transcript::{FunctionCallRecord, TranscriptEntry};

/// System instruction baked into every session unless overridden.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are MKE.dev, a Milwaukee real-estate and \
zoning assistant. Answer questions about properties, development sites, and the zoning code. \
Use the provided functions to search listings, control the map, and consult the zoning code; \
keep spoken answers short and concrete.";

/// Ordered signal stream from the orchestrator to the host UI.
#[derive(Debug)]
pub enum SessionUpdate {
    StateChanged(VoiceState),
    EntryAppended(TranscriptEntry),
    PartialTranscript(String),
    SessionError(String),
}

/// Opens live sessions. The WebSocket implementation is
/// [`WsSessionFactory`]; tests substitute in-memory fakes.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(
        &self,
        credential: Credential,
        setup: SetupConfig,
    ) -> mkedev_live::Result<(Arc<dyn LiveSession>, mpsc::Receiver<LiveEvent>)>;
}

/// Factory producing [`LiveClient`] connections.
pub struct WsSessionFactory {
    endpoint: String,
    policy: ReconnectPolicy,
}

impl WsSessionFactory {
    pub fn new() -> Self {
        Self {
            endpoint: mkedev_live::DEFAULT_ENDPOINT.to_string(),
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for WsSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for WsSessionFactory {
    async fn open(
        &self,
        credential: Credential,
        setup: SetupConfig,
    ) -> mkedev_live::Result<(Arc<dyn LiveSession>, mpsc::Receiver<LiveEvent>)> {
        let client = LiveClient::with_endpoint(setup, &self.endpoint).with_policy(self.policy);
        let Some(events) = client.take_events() else {
            return Err(mkedev_live::LiveError::Connection(
                "event channel already taken".into(),
            ));
        };
        client.connect(credential).await?;
        Ok((Arc::new(client), events))
    }
}

/// Per-session configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub modalities: Vec<Modality>,
    pub voice: Option<String>,
    pub system_instruction: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            modalities: vec![Modality::Audio],
            voice: Some(VOICE_AOEDE.to_string()),
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

/// Injected collaborators and owned resources of the orchestrator.
pub struct SessionParts {
    pub factory: Arc<dyn SessionFactory>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub registry: Arc<ToolRegistry>,
    pub recorder: Recorder,
    pub player: Player,
}

struct ActiveSession {
    client: Arc<dyn LiveSession>,
    pump: tokio::task::JoinHandle<()>,
}

struct Inner {
    options: SessionOptions,
    factory: Arc<dyn SessionFactory>,
    credentials: Arc<dyn CredentialProvider>,
    registry: Arc<ToolRegistry>,
    player: Player,
    recorder: Mutex<Recorder>,
    state: Mutex<VoiceState>,
    transcript: Mutex<Vec<TranscriptEntry>>,
    last_error: Mutex<Option<String>>,
    active: Mutex<Option<ActiveSession>>,
    updates_tx: mpsc::Sender<SessionUpdate>,
    /// Bumped by `end_session`; pump work from an older epoch is
    /// discarded instead of mutating the next session.
    epoch: AtomicU64,
}

/// The top-level voice session exposed to the host application.
pub struct VoiceSession {
    inner: Arc<Inner>,
}

impl VoiceSession {
    /// Creates an inactive session and the host-facing update stream.
    pub fn new(options: SessionOptions, parts: SessionParts) -> (Self, mpsc::Receiver<SessionUpdate>) {
        let (updates_tx, updates_rx) = mpsc::channel(256);
        let session = Self {
            inner: Arc::new(Inner {
                options,
                factory: parts.factory,
                credentials: parts.credentials,
                registry: parts.registry,
                player: parts.player,
                recorder: Mutex::new(parts.recorder),
                state: Mutex::new(VoiceState::Inactive),
                transcript: Mutex::new(Vec::new()),
                last_error: Mutex::new(None),
                active: Mutex::new(None),
                updates_tx,
                epoch: AtomicU64::new(0),
            }),
        };
        (session, updates_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VoiceState {
        *self.inner.state.lock()
    }

    /// The transcript so far, in emission order.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.transcript.lock().clone()
    }

    /// The last error message, if the session has failed.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    /// Starts a session: acquires a credential, connects, and begins
    /// capturing. A no-op with a warning while a session is active
    /// (including the `Error` state, which requires `end_session`
    /// first).
    pub async fn start_session(&self) -> Result<()> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        {
            let mut state = self.inner.state.lock();
            if state.is_active() {
                warn!("session already active ({}), ignoring start", state);
                return Ok(());
            }
            *state = VoiceState::Connecting;
        }
        emit(&self.inner, SessionUpdate::StateChanged(VoiceState::Connecting)).await;
        *self.inner.last_error.lock() = None;

        let issued = match self.inner.credentials.issue().await {
            Ok(issued) => issued,
            Err(e) => {
                fail(&self.inner, format!("credential acquisition failed: {e:#}")).await;
                return Err(AgentError::Credential(e));
            }
        };

        let setup = SetupConfig {
            model: issued.model,
            modalities: self.inner.options.modalities.clone(),
            voice: self.inner.options.voice.clone(),
            system_instruction: self.inner.options.system_instruction.clone(),
            tools: self.declarations(),
        };

        let (client, events) = match self.inner.factory.open(issued.credential, setup).await {
            Ok(opened) => opened,
            Err(e) => {
                fail(&self.inner, e.to_string()).await;
                return Err(AgentError::Connect(e));
            }
        };

        // end_session ran while the connect was in flight.
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            let _ = client.close().await;
            return Ok(());
        }

        // Microphone frames flow straight into the live client.
        let (frame_tx, frame_rx) = mpsc::channel(32);
        if let Err(e) = self.inner.recorder.lock().start(frame_tx) {
            let _ = client.close().await;
            fail(&self.inner, e.to_string()).await;
            return Err(AgentError::Audio(e));
        }
        tokio::spawn(forward_frames(client.clone(), frame_rx));

        let pump = tokio::spawn(run_pump(self.inner.clone(), client.clone(), events, epoch));
        *self.inner.active.lock() = Some(ActiveSession { client, pump });

        set_state(&self.inner, VoiceState::Listening).await;
        Ok(())
    }

    /// Ends the session: stops capture and playback, closes the
    /// connection, and resets to `Inactive`. Safe at any time,
    /// including mid-connect, mid-call, and when already inactive; a
    /// function-call result still pending when this runs is discarded.
    pub async fn end_session(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let active = self.inner.active.lock().take();
        self.inner.recorder.lock().stop();
        self.inner.player.stop();
        if let Some(active) = active {
            active.pump.abort();
            let _ = active.client.close().await;
        }
        set_state(&self.inner, VoiceState::Inactive).await;
    }

    /// Appends a user entry and forwards the text as a complete turn.
    /// A no-op when not connected.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        if !self.state().is_connected() {
            warn!("session not connected, dropping text turn");
            return Ok(());
        }
        let client = self.inner.active.lock().as_ref().map(|a| a.client.clone());
        let Some(client) = client else {
            warn!("session not connected, dropping text turn");
            return Ok(());
        };
        append_entry(&self.inner, TranscriptEntry::user(text)).await;
        client.send_text(text).await?;
        Ok(())
    }

    /// Mutes or unmutes playback.
    pub fn set_muted(&self, muted: bool) {
        self.inner.player.set_muted(muted);
    }

    /// Sets the playback volume (clamped to [0, 1]).
    pub fn set_volume(&self, volume: f32) {
        self.inner.player.set_volume(volume);
    }

    fn declarations(&self) -> Vec<FunctionDecl> {
        self.inner.registry.declarations()
    }
}

async fn emit(inner: &Arc<Inner>, update: SessionUpdate) {
    if inner.updates_tx.send(update).await.is_err() {
        debug!("host update channel closed");
    }
}

/// Moves to `to` if the state differs, emitting the change.
async fn set_state(inner: &Arc<Inner>, to: VoiceState) {
    let changed = {
        let mut state = inner.state.lock();
        if *state == to {
            false
        } else {
            *state = to;
            true
        }
    };
    if changed {
        emit(inner, SessionUpdate::StateChanged(to)).await;
    }
}

/// Records a failure and parks the session in `Error` until the host
/// ends it.
async fn fail(inner: &Arc<Inner>, message: String) {
    *inner.last_error.lock() = Some(message.clone());
    emit(inner, SessionUpdate::SessionError(message)).await;
    set_state(inner, VoiceState::Error).await;
}

async fn append_entry(inner: &Arc<Inner>, entry: TranscriptEntry) {
    inner.transcript.lock().push(entry.clone());
    emit(inner, SessionUpdate::EntryAppended(entry)).await;
}

async fn forward_frames(client: Arc<dyn LiveSession>, mut frame_rx: mpsc::Receiver<AudioFrame>) {
    while let Some(frame) = frame_rx.recv().await {
        if client.send_audio(&frame).await.is_err() {
            break;
        }
    }
}

/// Serial event pump: the single writer of session state for one
/// session epoch.
async fn run_pump(
    inner: Arc<Inner>,
    client: Arc<dyn LiveSession>,
    mut events: mpsc::Receiver<LiveEvent>,
    epoch: u64,
) {
    let mut partial = String::new();
    let mut pending_calls: Vec<FunctionCallRecord> = Vec::new();
    let mut pending_cards: Vec<Card> = Vec::new();

    let stale = |inner: &Arc<Inner>| inner.epoch.load(Ordering::SeqCst) != epoch;

    while let Some(event) = events.recv().await {
        if stale(&inner) {
            return;
        }
        match event {
            LiveEvent::SetupComplete => {}
            LiveEvent::AudioDelta(frame) => {
                if let Err(e) = inner.player.enqueue(&frame) {
                    warn!("playback unavailable, dropping frame: {}", e);
                }
            }
            LiveEvent::TextDelta(text) => {
                if partial.is_empty() && !text.trim().is_empty() {
                    set_state(&inner, VoiceState::Processing).await;
                }
                partial.push_str(&text);
                emit(&inner, SessionUpdate::PartialTranscript(partial.clone())).await;
            }
            LiveEvent::TurnComplete => {
                // Cards and call records wait for the next text-bearing
                // entry; a silent turn leaves them pending.
                if !partial.is_empty() {
                    let entry = TranscriptEntry::assistant(
                        std::mem::take(&mut partial),
                        std::mem::take(&mut pending_calls),
                        std::mem::take(&mut pending_cards),
                    );
                    append_entry(&inner, entry).await;
                    emit(&inner, SessionUpdate::PartialTranscript(String::new())).await;
                }
                set_state(&inner, VoiceState::Listening).await;
            }
            LiveEvent::FunctionCalls(batch) => {
                set_state(&inner, VoiceState::Processing).await;
                for call in batch {
                    let reply = inner.registry.dispatch(&call.name, call.args.clone()).await;
                    if stale(&inner) {
                        // Session ended while the handler ran; the
                        // result is discarded, not sent.
                        return;
                    }
                    pending_calls.push(FunctionCallRecord::completed(
                        &call.name,
                        call.args,
                        reply.result.clone(),
                    ));
                    if let Some(card) = reply.card {
                        pending_cards.push(card);
                    }
                    // Exactly one result per call, success or failure.
                    if let Err(e) = client
                        .send_function_result(&call.id, &call.name, &reply.result)
                        .await
                    {
                        warn!("failed to send function result for {}: {}", call.id, e);
                    }
                }
                set_state(&inner, VoiceState::Listening).await;
            }
            LiveEvent::Error(e) => {
                fail(&inner, e.to_string()).await;
            }
            LiveEvent::Closed { unexpected } => {
                inner.recorder.lock().stop();
                inner.player.stop();
                inner.active.lock().take();
                if unexpected {
                    if *inner.state.lock() != VoiceState::Error {
                        fail(&inner, "connection closed unexpectedly".to_string()).await;
                    }
                } else if *inner.state.lock() != VoiceState::Error {
                    set_state(&inner, VoiceState::Inactive).await;
                }
                return;
            }
        }
    }
}
