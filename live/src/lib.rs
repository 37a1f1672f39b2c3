//! Client for the Gemini Live bidirectional streaming API.
//!
//! This crate owns the persistent streaming connection of a voice
//! session: the JSON envelope codec, the WebSocket client with its
//! read/write loops, and the bounded reconnect policy. Decoded inbound
//! traffic is delivered as a channel of typed [`LiveEvent`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use mkedev_live::{Credential, LiveClient, LiveEvent, LiveSession, SetupConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LiveClient::new(SetupConfig::default());
//!     let mut events = client.take_events().unwrap();
//!
//!     client
//!         .connect(Credential::long_lived(std::env::var("GEMINI_API_KEY")?))
//!         .await?;
//!
//!     client.send_text("what is 1822 N Farwell Ave zoned as?").await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             LiveEvent::TextDelta(text) => print!("{}", text),
//!             LiveEvent::TurnComplete => break,
//!             _ => {}
//!         }
//!     }
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod session;
pub mod types;
pub mod wire;

pub use client::{LiveClient, LiveEvent};
pub use error::{LiveError, Result, WireError};
pub use session::LiveSession;
pub use types::{
    ConnectionState, Credential, CredentialKind, DEFAULT_ENDPOINT, FunctionDecl,
    MODEL_FLASH_LIVE, MODEL_FLASH_NATIVE_AUDIO, Modality, ReconnectPolicy, SetupConfig,
    VOICE_AOEDE, VOICE_CHARON, VOICE_FENRIR, VOICE_KORE, VOICE_PUCK,
};
pub use wire::{FunctionCallEvent, ServerEvent};
