//! Realtime endpoint WebSocket message types.
//!
//! All events are JSON objects discriminated by a `type` field.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Declare voice, instructions and audio formats
//! - input_audio_buffer.append - Append caller audio to the input buffer
//! - input_audio_buffer.commit - Close the current input turn
//! - response.create - Ask for a reply to the committed turn
//! - session.close - End the session
//!
//! Server events (received from server):
//! - response.output_text.delta / response.output_text.completed
//! - response.output_audio.delta
//! - response.input_audio_transcription.delta / .completed
//! - response.completed
//! - error / response.error

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{DEFAULT_RESPONSE_INSTRUCTIONS, PCM16_FORMAT};
use crate::core::audio::TELEPHONY_SAMPLE_RATE;

// =============================================================================
// Session Configuration
// =============================================================================

/// Audio format declaration for input or output audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Encoding name (e.g., "pcm16")
    #[serde(rename = "type")]
    pub format_type: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFormat {
    /// 16-bit linear PCM at the telephony sample rate.
    pub fn telephony_pcm16() -> Self {
        Self {
            format_type: PCM16_FORMAT.to_string(),
            sample_rate: TELEPHONY_SAMPLE_RATE,
        }
    }
}

/// Session configuration sent once when the session opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Voice for audio output
    pub voice: String,

    /// System instructions for the assistant
    pub instructions: String,

    /// Response modalities (text, audio)
    pub modalities: Vec<String>,

    /// Input audio format
    pub input_audio_format: AudioFormat,

    /// Output audio format
    pub output_audio_format: AudioFormat,
}

impl SessionConfig {
    /// Text and audio output, PCM16 at 8kHz in both directions.
    pub fn for_telephony(voice: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            instructions: instructions.into(),
            modalities: text_and_audio(),
            input_audio_format: AudioFormat::telephony_pcm16(),
            output_audio_format: AudioFormat::telephony_pcm16(),
        }
    }
}

/// Per-response overrides for `response.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities
    pub modalities: Vec<String>,
    /// Instructions for this response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            modalities: text_and_audio(),
            instructions: Some(DEFAULT_RESPONSE_INSTRUCTIONS.to_string()),
        }
    }
}

fn text_and_audio() -> Vec<String> {
    vec!["text".to_string(), "audio".to_string()]
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 audio
        audio: String,
    },

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response configuration
        response: ResponseConfig,
    },

    /// Close the session
    #[serde(rename = "session.close")]
    SessionClose,
}

impl ClientEvent {
    /// Create an audio append event from raw PCM bytes.
    pub fn audio_append(pcm: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(pcm),
        }
    }

    /// `response.create` with the default continuation instructions.
    pub fn response_create() -> Self {
        ClientEvent::ResponseCreate {
            response: ResponseConfig::default(),
        }
    }

    /// The `type` discriminator, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            ClientEvent::InputAudioBufferCommit => "input_audio_buffer.commit",
            ClientEvent::ResponseCreate { .. } => "response.create",
            ClientEvent::SessionClose => "session.close",
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Error payload attached to `error` events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error_type.as_deref().unwrap_or("unknown"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// Error payload as sent by the endpoint: usually an object, sometimes a bare string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Detail(ApiError),
    Message(String),
    Other(serde_json::Value),
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPayload::Detail(error) => error.fmt(f),
            ErrorPayload::Message(message) => f.write_str(message),
            ErrorPayload::Other(value) => write!(f, "{value}"),
        }
    }
}

/// Server events received from the realtime endpoint.
///
/// Event types the bridge does not act on deserialize to [`ServerEvent::Unknown`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        #[serde(default)]
        error: Option<ErrorPayload>,
    },

    /// Response-scoped error
    #[serde(rename = "response.error")]
    ResponseError {
        /// Error details
        #[serde(default)]
        error: Option<ErrorPayload>,
    },

    /// Assistant text chunk
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// Text delta
        #[serde(default)]
        delta: String,
    },

    /// Assistant text finished
    #[serde(rename = "response.output_text.completed")]
    OutputTextCompleted,

    /// Synthesized audio chunk
    #[serde(rename = "response.output_audio.delta")]
    OutputAudioDelta {
        /// Base64-encoded PCM16 audio
        #[serde(default)]
        audio: String,
    },

    /// Caller transcription chunk
    #[serde(rename = "response.input_audio_transcription.delta")]
    InputTranscriptionDelta {
        /// Text delta
        #[serde(default)]
        delta: String,
    },

    /// Caller transcription finished
    #[serde(rename = "response.input_audio_transcription.completed")]
    InputTranscriptionCompleted,

    /// Whole response finished
    #[serde(rename = "response.completed")]
    ResponseCompleted,

    /// Any other event type
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Error details for `error` and `response.error` events.
    pub fn error_details(&self) -> Option<String> {
        match self {
            ServerEvent::Error { error } | ServerEvent::ResponseError { error } => Some(
                error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unspecified error".to_string()),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_update_shape() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig::for_telephony("verse", "Be nice."),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "session.update",
                "session": {
                    "voice": "verse",
                    "instructions": "Be nice.",
                    "modalities": ["text", "audio"],
                    "input_audio_format": {"type": "pcm16", "sample_rate": 8000},
                    "output_audio_format": {"type": "pcm16", "sample_rate": 8000}
                }
            })
        );
    }

    #[test]
    fn test_commit_and_close_are_bare() {
        assert_eq!(
            serde_json::to_value(ClientEvent::InputAudioBufferCommit).unwrap(),
            json!({"type": "input_audio_buffer.commit"})
        );
        assert_eq!(
            serde_json::to_value(ClientEvent::SessionClose).unwrap(),
            json!({"type": "session.close"})
        );
    }

    #[test]
    fn test_response_create_shape() {
        assert_eq!(
            serde_json::to_value(ClientEvent::response_create()).unwrap(),
            json!({
                "type": "response.create",
                "response": {
                    "modalities": ["text", "audio"],
                    "instructions": "Continue assisting the caller naturally."
                }
            })
        );
    }

    #[test]
    fn test_audio_append_encodes_base64() {
        let event = ClientEvent::audio_append(&[1, 2, 3]);
        assert_eq!(
            event,
            ClientEvent::InputAudioBufferAppend {
                audio: "AQID".to_string()
            }
        );
    }

    #[test]
    fn test_parse_known_server_events() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"response.output_text.delta","delta":"Hi"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::OutputTextDelta {
                delta: "Hi".to_string()
            }
        );

        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"response.output_audio.delta","audio":"AAA="}"#)
                .unwrap();
        assert_eq!(
            event,
            ServerEvent::OutputAudioDelta {
                audio: "AAA=".to_string()
            }
        );

        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"response.completed","response":{"id":"r1"}}"#)
                .unwrap();
        assert_eq!(event, ServerEvent::ResponseCompleted);
    }

    #[test]
    fn test_missing_delta_defaults_to_empty() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"response.input_audio_transcription.delta"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::InputTranscriptionDelta {
                delta: String::new()
            }
        );
    }

    #[test]
    fn test_unknown_event_type() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"session.created","session":{"id":"s"}}"#).unwrap();
        assert_eq!(event, ServerEvent::Unknown);
    }

    #[test]
    fn test_error_details() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad turn"}}"#,
        )
        .unwrap();
        assert_eq!(
            event.error_details().as_deref(),
            Some("invalid_request_error: bad turn")
        );

        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"error","error":"rate limited"}"#).unwrap();
        assert_eq!(event.error_details().as_deref(), Some("rate limited"));

        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"response.error","error":[1,2]}"#).unwrap();
        assert_eq!(event.error_details().as_deref(), Some("[1,2]"));

        let event: ServerEvent = serde_json::from_str(r#"{"type":"response.error"}"#).unwrap();
        assert_eq!(event.error_details().as_deref(), Some("unspecified error"));
        assert!(ServerEvent::ResponseCompleted.error_details().is_none());
    }
}
