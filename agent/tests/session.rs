//! Orchestrator behavior tests over an in-memory live session.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;

use mkedev_agent::{
    CredentialProvider, IssuedCredential, Role, SessionFactory, SessionOptions, SessionParts,
    SessionUpdate, VoiceSession, VoiceState,
};
use mkedev_audio::{
    AudioFrame, CaptureDevice, Format, MemoryPlayback, Player, Recorder,
};
use mkedev_live::{
    ConnectionState, Credential, FunctionCallEvent, LiveEvent, LiveSession, SetupConfig,
};
use mkedev_tools::{
    MapControl, RecordingMap, SampleData, StaticZoning, ToolDeps, builtin_registry,
};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Audio(usize),
    Text(String),
    FunctionResult {
        id: String,
        name: String,
        result: Value,
    },
}

#[derive(Default)]
struct FakeLive {
    sends: Mutex<Vec<Sent>>,
    closed: Mutex<bool>,
}

impl FakeLive {
    fn sends(&self) -> Vec<Sent> {
        self.sends.lock().clone()
    }

    fn function_results(&self) -> Vec<(String, Value)> {
        self.sends()
            .into_iter()
            .filter_map(|s| match s {
                Sent::FunctionResult { id, result, .. } => Some((id, result)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LiveSession for FakeLive {
    async fn send_audio(&self, frame: &AudioFrame) -> mkedev_live::Result<()> {
        self.sends.lock().push(Sent::Audio(frame.len()));
        Ok(())
    }

    async fn send_text(&self, text: &str) -> mkedev_live::Result<()> {
        self.sends.lock().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_function_result(
        &self,
        call_id: &str,
        name: &str,
        result: &Value,
    ) -> mkedev_live::Result<()> {
        self.sends.lock().push(Sent::FunctionResult {
            id: call_id.to_string(),
            name: name.to_string(),
            result: result.clone(),
        });
        Ok(())
    }

    async fn close(&self) -> mkedev_live::Result<()> {
        *self.closed.lock() = true;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if *self.closed.lock() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }
}

struct FakeFactory {
    session: Arc<FakeLive>,
    events: Mutex<Option<mpsc::Receiver<LiveEvent>>>,
    opens: AtomicUsize,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(
        &self,
        _credential: Credential,
        _setup: SetupConfig,
    ) -> mkedev_live::Result<(Arc<dyn LiveSession>, mpsc::Receiver<LiveEvent>)> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let Some(events) = self.events.lock().take() else {
            return Err(mkedev_live::LiveError::Connection("exhausted".into()));
        };
        Ok((self.session.clone(), events))
    }
}

struct TestCredentials;

#[async_trait]
impl CredentialProvider for TestCredentials {
    async fn issue(&self) -> anyhow::Result<IssuedCredential> {
        Ok(IssuedCredential {
            credential: Credential::long_lived("test-key"),
            model: "test-model".into(),
        })
    }
}

struct NoopCapture {
    stops: Arc<AtomicUsize>,
}

impl CaptureDevice for NoopCapture {
    fn start(
        &mut self,
        _format: Format,
        _frame_tx: mpsc::Sender<AudioFrame>,
    ) -> mkedev_audio::Result<()> {
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Map control whose snapshot capture always fails.
#[derive(Debug, Default)]
struct BrokenMap;

#[async_trait]
impl MapControl for BrokenMap {
    async fn fly_to(&self, _lng: f64, _lat: f64, _zoom: f64) -> anyhow::Result<()> {
        Ok(())
    }
    async fn set_layer_visibility(&self, _layer: &str, _visible: bool) -> anyhow::Result<()> {
        Ok(())
    }
    async fn set_layer_opacity(&self, _layer: &str, _opacity: f64) -> anyhow::Result<()> {
        Ok(())
    }
    async fn reset_view(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn capture_snapshot(&self) -> anyhow::Result<String> {
        anyhow::bail!("renderer offline")
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    session: VoiceSession,
    updates: mpsc::Receiver<SessionUpdate>,
    events_tx: mpsc::Sender<LiveEvent>,
    live: Arc<FakeLive>,
    factory: Arc<FakeFactory>,
    playback: MemoryPlayback,
    capture_stops: Arc<AtomicUsize>,
}

fn harness_with_map(map: Arc<dyn MapControl>) -> Harness {
    let live = Arc::new(FakeLive::default());
    let (events_tx, events_rx) = mpsc::channel(64);
    let factory = Arc::new(FakeFactory {
        session: live.clone(),
        events: Mutex::new(Some(events_rx)),
        opens: AtomicUsize::new(0),
    });

    let registry = builtin_registry(ToolDeps {
        map,
        data: Arc::new(SampleData::new()),
        zoning: Arc::new(StaticZoning),
    });

    let playback = MemoryPlayback::new();
    let capture_stops = Arc::new(AtomicUsize::new(0));
    let (session, updates) = VoiceSession::new(
        SessionOptions::default(),
        SessionParts {
            factory: factory.clone(),
            credentials: Arc::new(TestCredentials),
            registry: Arc::new(registry),
            recorder: Recorder::new(Box::new(NoopCapture {
                stops: capture_stops.clone(),
            })),
            player: Player::new(Box::new(playback.clone())),
        },
    );

    Harness {
        session,
        updates,
        events_tx,
        live,
        factory,
        playback,
        capture_stops,
    }
}

fn harness() -> Harness {
    harness_with_map(Arc::new(RecordingMap::new()))
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn next_update(updates: &mut mpsc::Receiver<SessionUpdate>) -> SessionUpdate {
    timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("timed out waiting for update")
        .expect("update channel closed")
}

/// Reads updates until an entry is appended.
async fn next_entry(updates: &mut mpsc::Receiver<SessionUpdate>) -> mkedev_agent::TranscriptEntry {
    loop {
        if let SessionUpdate::EntryAppended(entry) = next_update(updates).await {
            return entry;
        }
    }
}

fn call(id: &str, name: &str, args: Value) -> FunctionCallEvent {
    FunctionCallEvent {
        id: id.to_string(),
        name: name.to_string(),
        args,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_double_start_opens_one_connection() {
    let h = harness();
    h.session.start_session().await.unwrap();
    assert_eq!(h.session.state(), VoiceState::Listening);

    // Second start is a warned no-op, not a second connection.
    h.session.start_session().await.unwrap();
    assert_eq!(h.factory.opens.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.state(), VoiceState::Listening);
}

#[tokio::test]
async fn test_end_session_is_idempotent() {
    let mut h = harness();
    h.session.end_session().await;
    assert_eq!(h.session.state(), VoiceState::Inactive);
    // Already inactive: no state change was emitted.
    assert!(h.updates.try_recv().is_err());

    h.session.start_session().await.unwrap();
    h.session.end_session().await;
    h.session.end_session().await;
    assert_eq!(h.session.state(), VoiceState::Inactive);
    assert_eq!(h.capture_stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_send_text_appends_and_forwards() {
    let mut h = harness();

    // Not connected yet: dropped without error, no entry.
    h.session.send_text("hello?").await.unwrap();
    assert!(h.session.transcript().is_empty());

    h.session.start_session().await.unwrap();
    h.session.send_text("show me homes in Bay View").await.unwrap();

    let transcript = h.session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].text, "show me homes in Bay View");
    assert!(
        h.live
            .sends()
            .contains(&Sent::Text("show me homes in Bay View".into()))
    );

    // Updates carried the state changes and the entry, in order.
    assert!(matches!(
        next_update(&mut h.updates).await,
        SessionUpdate::StateChanged(VoiceState::Connecting)
    ));
    assert!(matches!(
        next_update(&mut h.updates).await,
        SessionUpdate::StateChanged(VoiceState::Listening)
    ));
    assert!(matches!(
        next_update(&mut h.updates).await,
        SessionUpdate::EntryAppended(_)
    ));
}

#[tokio::test]
async fn test_audio_deltas_reach_playback() {
    let h = harness();
    h.session.start_session().await.unwrap();

    let frame = AudioFrame::from_samples(Format::PLAYBACK, &[3000, -3000]);
    h.events_tx
        .send(LiveEvent::AudioDelta(frame))
        .await
        .unwrap();

    let playback = h.playback.clone();
    wait_for(move || playback.rendered().len() == 1).await;
}

#[tokio::test]
async fn test_exactly_one_result_per_call_even_on_failure() {
    let h = harness_with_map(Arc::new(BrokenMap));
    h.session.start_session().await.unwrap();

    h.events_tx
        .send(LiveEvent::FunctionCalls(vec![
            call("c1", "capture_map_snapshot", json!({})),
            call("c2", "toggle_map_layer", json!({"layer": "zoning", "visible": true})),
        ]))
        .await
        .unwrap();

    let live = h.live.clone();
    wait_for(move || live.function_results().len() == 2).await;

    let results = h.live.function_results();
    assert_eq!(results.len(), 2);
    // The broken collaborator's error came back as a structured
    // failure, not silence.
    assert_eq!(results[0].0, "c1");
    assert_eq!(results[0].1["success"], false);
    assert_eq!(results[0].1["error"], "renderer offline");
    assert_eq!(results[1].0, "c2");
    assert_eq!(results[1].1["success"], true);
}

#[tokio::test]
async fn test_unknown_function_answered_and_session_stays_listening() {
    let h = harness();
    h.session.start_session().await.unwrap();

    h.events_tx
        .send(LiveEvent::FunctionCalls(vec![call(
            "c9",
            "does_not_exist",
            json!({}),
        )]))
        .await
        .unwrap();

    let live = h.live.clone();
    wait_for(move || live.function_results().len() == 1).await;

    let results = h.live.function_results();
    assert_eq!(
        results[0].1,
        json!({"success": false, "error": "Unknown function: does_not_exist"})
    );
    assert_eq!(h.session.state(), VoiceState::Listening);
}

#[tokio::test]
async fn test_cards_flush_onto_next_text_entry() {
    let mut h = harness();
    h.session.start_session().await.unwrap();

    // Two calls complete (each producing a card) before any text.
    h.events_tx
        .send(LiveEvent::FunctionCalls(vec![call(
            "c1",
            "capture_map_snapshot",
            json!({}),
        )]))
        .await
        .unwrap();
    h.events_tx
        .send(LiveEvent::FunctionCalls(vec![call(
            "c2",
            "search_homes",
            json!({"neighborhood": "Bay View"}),
        )]))
        .await
        .unwrap();

    let live = h.live.clone();
    wait_for(move || live.function_results().len() == 2).await;

    // A silent turn boundary does not flush pending cards.
    h.events_tx.send(LiveEvent::TurnComplete).await.unwrap();

    h.events_tx
        .send(LiveEvent::TextDelta("I found two homes".into()))
        .await
        .unwrap();
    h.events_tx.send(LiveEvent::TurnComplete).await.unwrap();

    let entry = next_entry(&mut h.updates).await;
    assert_eq!(entry.role, Role::Assistant);
    assert_eq!(entry.text, "I found two homes");
    assert_eq!(entry.cards.len(), 2);
    assert_eq!(entry.cards[0].kind(), "map_snapshot");
    assert_eq!(entry.cards[1].kind(), "home_listings");
    assert_eq!(entry.calls.len(), 2);

    // The pending buffer is empty: the next turn carries no cards.
    h.events_tx
        .send(LiveEvent::TextDelta("Anything else?".into()))
        .await
        .unwrap();
    h.events_tx.send(LiveEvent::TurnComplete).await.unwrap();

    let entry = next_entry(&mut h.updates).await;
    assert_eq!(entry.text, "Anything else?");
    assert!(entry.cards.is_empty());
    assert!(entry.calls.is_empty());
}

#[tokio::test]
async fn test_transport_error_parks_session_in_error() {
    let h = harness();
    h.session.start_session().await.unwrap();

    h.events_tx
        .send(LiveEvent::Error(mkedev_live::LiveError::Connection(
            "carrier lost".into(),
        )))
        .await
        .unwrap();
    h.events_tx
        .send(LiveEvent::Closed { unexpected: true })
        .await
        .unwrap();

    let session = &h.session;
    wait_for(move || session.state() == VoiceState::Error).await;
    assert_eq!(h.session.state(), VoiceState::Error);
    assert!(h.session.last_error().unwrap().contains("carrier lost"));

    // Start while in error is refused until the session is ended.
    h.session.start_session().await.unwrap();
    assert_eq!(h.factory.opens.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.state(), VoiceState::Error);

    h.session.end_session().await;
    assert_eq!(h.session.state(), VoiceState::Inactive);
}

#[tokio::test]
async fn test_normal_remote_close_returns_to_inactive() {
    let h = harness();
    h.session.start_session().await.unwrap();

    h.events_tx
        .send(LiveEvent::Closed { unexpected: false })
        .await
        .unwrap();

    let session = &h.session;
    wait_for(move || session.state() == VoiceState::Inactive).await;
    assert_eq!(h.capture_stops.load(Ordering::SeqCst), 1);
}
