//! Type definitions for the live streaming session.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Models
// ============================================================================

/// Flash live model with native audio output.
pub const MODEL_FLASH_NATIVE_AUDIO: &str = "gemini-2.5-flash-native-audio-preview-12-2025";
/// Flash live model (half-cascade audio).
pub const MODEL_FLASH_LIVE: &str = "gemini-2.0-flash-live-001";

// ============================================================================
// Voices
// ============================================================================

pub const VOICE_AOEDE: &str = "Aoede";
pub const VOICE_CHARON: &str = "Charon";
pub const VOICE_FENRIR: &str = "Fenrir";
pub const VOICE_KORE: &str = "Kore";
pub const VOICE_PUCK: &str = "Puck";

/// Default WebSocket endpoint for the bidirectional generate API.
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

// ============================================================================
// Configuration
// ============================================================================

/// Response modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    Text,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Audio => "AUDIO",
        }
    }
}

/// Declaration of one callable function, advertised during setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Function name the model invokes.
    pub name: String,
    /// What the function does, for the model's benefit.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

/// Configuration carried by the setup envelope.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Model ID to use.
    pub model: String,
    /// Requested response modalities.
    pub modalities: Vec<Modality>,
    /// Voice for audio output.
    pub voice: Option<String>,
    /// System instruction text.
    pub system_instruction: Option<String>,
    /// Function declaration table.
    pub tools: Vec<FunctionDecl>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            model: MODEL_FLASH_NATIVE_AUDIO.to_string(),
            modalities: vec![Modality::Audio],
            voice: Some(VOICE_AOEDE.to_string()),
            system_instruction: None,
            tools: Vec::new(),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// How a connection credential may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// A long-lived API key; reconnecting with it is allowed.
    LongLived,
    /// A single-use token; reconnecting with a consumed token is
    /// guaranteed to fail, so the client never retries with one.
    Ephemeral,
}

/// A connection credential. Held in memory only for the lifetime of the
/// connection attempt; never persisted.
#[derive(Clone)]
pub struct Credential {
    token: String,
    kind: CredentialKind,
}

impl Credential {
    pub fn long_lived(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: CredentialKind::LongLived,
        }
    }

    pub fn ephemeral(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: CredentialKind::Ephemeral,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }
}

// Token material must never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .finish()
    }
}

// ============================================================================
// Reconnect policy
// ============================================================================

/// Bound on reconnection after unexpected closure. The defaults are a
/// business policy, not an invariant; tune freely.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Maximum reconnect attempts per session.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

// ============================================================================
// Connection state
// ============================================================================

/// Connection lifecycle of the session client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
