//! Envelope codec for the bidirectional generate protocol.
//!
//! Outbound envelopes are built with `json!`; inbound messages decode into
//! the closed [`ServerEvent`] set. Audio crosses the wire as base64
//! little-endian 16-bit PCM inside `inlineData`/`mediaChunks` parts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use mkedev_audio::{AudioFrame, Format};

use crate::error::WireError;
use crate::types::{FunctionDecl, SetupConfig};

/// One decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The service acknowledged the setup envelope.
    SetupComplete,
    /// A chunk of response text.
    TextDelta(String),
    /// A chunk of response audio (24 kHz PCM).
    AudioDelta(AudioFrame),
    /// A batch of function calls to execute locally.
    FunctionCalls(Vec<FunctionCallEvent>),
    /// The model finished its turn.
    TurnComplete,
}

/// A single remote-invoked function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallEvent {
    /// Call identifier the result must echo back.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Model-generated arguments. Untrusted input.
    pub args: Value,
}

/// Builds the handshake envelope carrying model, modalities, voice,
/// system instruction, and the function declaration table.
pub fn encode_setup(config: &SetupConfig) -> Value {
    let modalities: Vec<&str> = config.modalities.iter().map(|m| m.as_str()).collect();
    let mut generation_config = json!({ "responseModalities": modalities });
    if let Some(ref voice) = config.voice {
        generation_config["speechConfig"] = json!({
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
        });
    }

    let mut setup = json!({
        "model": format!("models/{}", config.model),
        "generationConfig": generation_config,
    });
    if let Some(ref instruction) = config.system_instruction {
        setup["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    if !config.tools.is_empty() {
        setup["tools"] = json!([{ "functionDeclarations": declarations(&config.tools) }]);
    }

    json!({ "setup": setup })
}

fn declarations(tools: &[FunctionDecl]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            })
        })
        .collect()
}

/// Builds a realtime-input envelope for one capture frame.
pub fn encode_audio_chunk(frame: &AudioFrame) -> Value {
    json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": format!("audio/pcm;rate={}", frame.format().sample_rate),
                "data": BASE64.encode(frame.as_bytes()),
            }]
        }
    })
}

/// Builds a client-content envelope for one text turn.
pub fn encode_text_turn(text: &str, turn_complete: bool) -> Value {
    json!({
        "clientContent": {
            "turns": [{ "role": "user", "parts": [{ "text": text }] }],
            "turnComplete": turn_complete,
        }
    })
}

/// Builds a tool-response envelope for one completed function call.
pub fn encode_function_result(call_id: &str, name: &str, result: &Value) -> Value {
    json!({
        "toolResponse": {
            "functionResponses": [{
                "id": call_id,
                "name": name,
                "response": result,
            }]
        }
    })
}

/// Decodes one raw inbound message.
///
/// Unknown or unparseable messages yield a [`WireError`]; the caller logs
/// it and drops the message without terminating the session.
pub fn decode(raw: &str) -> Result<ServerEvent, WireError> {
    let value: Value = serde_json::from_str(raw)?;

    if value.get("setupComplete").is_some() {
        return Ok(ServerEvent::SetupComplete);
    }

    if let Some(tool_call) = value.get("toolCall") {
        return decode_tool_call(tool_call);
    }

    if let Some(server_content) = value.get("serverContent") {
        return decode_server_content(server_content);
    }

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown");
        return Err(WireError::BadPayload(format!("service error: {message}")));
    }

    Err(WireError::UnknownMessage(truncate(raw, 200)))
}

fn decode_tool_call(tool_call: &Value) -> Result<ServerEvent, WireError> {
    let calls = tool_call
        .get("functionCalls")
        .and_then(|c| c.as_array())
        .ok_or_else(|| WireError::BadPayload("toolCall without functionCalls".into()))?;

    let mut batch = Vec::with_capacity(calls.len());
    for call in calls {
        let name = call
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| WireError::BadPayload("functionCall without name".into()))?;
        let id = call
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or(name)
            .to_string();
        let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
        batch.push(FunctionCallEvent {
            id,
            name: name.to_string(),
            args,
        });
    }
    if batch.is_empty() {
        return Err(WireError::BadPayload("empty functionCalls batch".into()));
    }
    Ok(ServerEvent::FunctionCalls(batch))
}

fn decode_server_content(content: &Value) -> Result<ServerEvent, WireError> {
    if let Some(parts) = content
        .get("modelTurn")
        .and_then(|t| t.get("parts"))
        .and_then(|p| p.as_array())
    {
        for part in parts {
            if let Some(data) = part
                .get("inlineData")
                .and_then(|d| d.get("data"))
                .and_then(|d| d.as_str())
            {
                let bytes = BASE64
                    .decode(data)
                    .map_err(|e| WireError::BadPayload(format!("bad audio base64: {e}")))?;
                return Ok(ServerEvent::AudioDelta(AudioFrame::new(
                    Format::PLAYBACK,
                    bytes,
                )));
            }
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                return Ok(ServerEvent::TextDelta(text.to_string()));
            }
        }
    }

    // Audio-native models speak; the transcription of that speech is the
    // textual channel.
    if let Some(text) = content
        .get("outputTranscription")
        .and_then(|t| t.get("text"))
        .and_then(|t| t.as_str())
    {
        return Ok(ServerEvent::TextDelta(text.to_string()));
    }

    let done = content
        .get("turnComplete")
        .or_else(|| content.get("generationComplete"))
        .and_then(|c| c.as_bool())
        .unwrap_or(false);
    if done {
        return Ok(ServerEvent::TurnComplete);
    }

    Err(WireError::UnknownMessage("serverContent without usable parts".into()))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}
