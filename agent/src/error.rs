//! Error types for the session orchestrator.

use thiserror::Error;

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur while driving a voice session.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The credential collaborator could not issue a token.
    #[error("credential acquisition failed: {0}")]
    Credential(#[source] anyhow::Error),

    /// Connecting the live session failed.
    #[error("connect failed: {0}")]
    Connect(#[from] mkedev_live::LiveError),

    /// The capture or playback device failed.
    #[error("audio error: {0}")]
    Audio(#[from] mkedev_audio::AudioError),
}
