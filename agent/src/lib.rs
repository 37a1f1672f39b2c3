//! Voice session orchestration for the MKE.dev assistant.
//!
//! The [`VoiceSession`] is the state machine the host application
//! drives: it acquires credentials, owns the audio adapter and live
//! client for the duration of a session, dispatches remote-invoked
//! function calls, and emits an ordered stream of transcript and state
//! updates. It renders nothing itself.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mkedev_agent::{
//!     EnvCredentialProvider, SessionOptions, SessionParts, VoiceSession, WsSessionFactory,
//! };
//! use mkedev_audio::{NullPlayback, Player, Recorder, SilenceCapture};
//! use mkedev_live::MODEL_FLASH_NATIVE_AUDIO;
//! use mkedev_tools::{RecordingMap, SampleData, StaticZoning, ToolDeps, builtin_registry};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = builtin_registry(ToolDeps {
//!     map: Arc::new(RecordingMap::new()),
//!     data: Arc::new(SampleData::new()),
//!     zoning: Arc::new(StaticZoning),
//! });
//!
//! let (session, mut updates) = VoiceSession::new(
//!     SessionOptions::default(),
//!     SessionParts {
//!         factory: Arc::new(WsSessionFactory::new()),
//!         credentials: Arc::new(EnvCredentialProvider::new(
//!             "GEMINI_API_KEY",
//!             MODEL_FLASH_NATIVE_AUDIO,
//!         )),
//!         registry: Arc::new(registry),
//!         recorder: Recorder::new(Box::new(SilenceCapture::default())),
//!         player: Player::new(Box::new(NullPlayback)),
//!     },
//! );
//!
//! session.start_session().await?;
//! while let Some(update) = updates.recv().await {
//!     println!("{update:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod transcript;

pub use credentials::{
    CredentialProvider, EnvCredentialProvider, HttpCredentialProvider, IssuedCredential,
};
pub use error::{AgentError, Result};
pub use orchestrator::{
    DEFAULT_SYSTEM_INSTRUCTION, SessionFactory, SessionOptions, SessionParts, SessionUpdate,
    VoiceSession, WsSessionFactory,
};
pub use state::VoiceState;
pub use transcript::{CallStatus, FunctionCallRecord, Role, TranscriptEntry};
