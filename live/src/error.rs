//! Error types for the live session client.

use thiserror::Error;

/// Result type for live session operations.
pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors that can occur on the streaming connection.
#[derive(Error, Debug)]
pub enum LiveError {
    /// Connection establishment failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote service rejected the session.
    #[error("api error: {0}")]
    Api(String),

    /// The session is closed.
    #[error("session closed")]
    SessionClosed,

    /// A connect was attempted while one is already in flight or open.
    #[error("already connected")]
    AlreadyConnected,

    /// Setup was not acknowledged in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// An inbound message could not be decoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Errors produced while decoding an inbound envelope.
///
/// A wire error terminates only the offending message, never the session;
/// callers log it and drop the message.
#[derive(Error, Debug)]
pub enum WireError {
    /// The raw message was not valid JSON.
    #[error("unparseable message: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON did not match any known envelope.
    #[error("unknown message shape: {0}")]
    UnknownMessage(String),

    /// A known envelope carried an invalid payload.
    #[error("bad payload: {0}")]
    BadPayload(String),
}
