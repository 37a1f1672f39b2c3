//! Append-only conversation transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use mkedev_tools::Card;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Outcome of a remote-invoked function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    Success,
    Error,
}

/// Record of one function call executed during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRecord {
    pub name: String,
    pub args: Value,
    pub result: Option<Value>,
    pub status: CallStatus,
}

impl FunctionCallRecord {
    /// Creates a completed record from a dispatch result. A result
    /// payload carrying `success: false` marks the call as failed.
    pub fn completed(name: impl Into<String>, args: Value, result: Value) -> Self {
        let status = if result.get("success").and_then(|s| s.as_bool()) == Some(false) {
            CallStatus::Error
        } else {
            CallStatus::Success
        };
        Self {
            name: name.into(),
            args,
            result: Some(result),
            status,
        }
    }
}

/// One turn of recorded speech or text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Function calls completed during this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<FunctionCallRecord>,
    /// Cards produced by those calls, in completion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
}

impl TranscriptEntry {
    /// A user entry for locally-sent text.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
            calls: Vec::new(),
            cards: Vec::new(),
        }
    }

    /// An assistant entry with the calls and cards that completed
    /// before its text arrived.
    pub fn assistant(
        text: impl Into<String>,
        calls: Vec<FunctionCallRecord>,
        cards: Vec<Card>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
            calls,
            cards,
        }
    }
}
