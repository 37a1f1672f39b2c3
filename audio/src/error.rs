//! Error types for audio capture and playback.

use thiserror::Error;

/// Result type for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;

/// Errors that can occur in the audio adapter.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The platform denied access to the capture device.
    #[error("capture permission denied")]
    PermissionDenied,

    /// No usable capture or playback device was found.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The adapter was destroyed and can no longer be used.
    #[error("audio adapter already closed")]
    AlreadyClosed,

    /// A PCM payload could not be decoded.
    #[error("malformed audio frame: {0}")]
    MalformedFrame(String),

    /// The underlying device reported a failure.
    #[error("device error: {0}")]
    Device(String),
}
