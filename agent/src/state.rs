//! Session lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a voice session as seen by the host application.
///
/// `Error` is sticky: the only way out is an explicit `end_session`
/// followed by a fresh `start_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoiceState {
    #[default]
    Inactive,
    Connecting,
    Listening,
    Processing,
    Error,
}

impl VoiceState {
    /// Returns true while a session is underway (including failed ones
    /// that have not been ended yet).
    pub fn is_active(&self) -> bool {
        !matches!(self, VoiceState::Inactive)
    }

    /// Returns true while the connection is usable.
    pub fn is_connected(&self) -> bool {
        matches!(self, VoiceState::Listening | VoiceState::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceState::Inactive => "inactive",
            VoiceState::Connecting => "connecting",
            VoiceState::Listening => "listening",
            VoiceState::Processing => "processing",
            VoiceState::Error => "error",
        }
    }
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for VoiceState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VoiceState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "connecting" => VoiceState::Connecting,
            "listening" => VoiceState::Listening,
            "processing" => VoiceState::Processing,
            "error" => VoiceState::Error,
            _ => VoiceState::Inactive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(!VoiceState::Inactive.is_active());
        assert!(VoiceState::Connecting.is_active());
        assert!(VoiceState::Error.is_active());
        assert!(VoiceState::Listening.is_connected());
        assert!(VoiceState::Processing.is_connected());
        assert!(!VoiceState::Error.is_connected());
    }

    #[test]
    fn test_serde_round_trip() {
        for state in [
            VoiceState::Inactive,
            VoiceState::Connecting,
            VoiceState::Listening,
            VoiceState::Processing,
            VoiceState::Error,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            let back: VoiceState = serde_json::from_str(&json).unwrap();
            assert_eq!(back, state);
        }
    }
}
