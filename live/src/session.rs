//! Session trait over the concrete transport.

use async_trait::async_trait;
use serde_json::Value;

use mkedev_audio::AudioFrame;

use crate::error::Result;
use crate::types::ConnectionState;

/// Outbound interface of a live session.
///
/// [`crate::LiveClient`] implements this over a WebSocket; test doubles
/// implement it in memory. All send operations are no-ops with a logged
/// warning when the session is not connected.
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Sends one capture frame as realtime input.
    async fn send_audio(&self, frame: &AudioFrame) -> Result<()>;

    /// Sends one complete user text turn.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Sends the result for a function call received from the service.
    async fn send_function_result(&self, call_id: &str, name: &str, result: &Value)
    -> Result<()>;

    /// Closes the connection with a normal-closure code. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;
}
