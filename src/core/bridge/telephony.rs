//! Telephony media-stream protocol.
//!
//! The provider sends one JSON object per WebSocket text frame, discriminated
//! by an `event` field. The bridge answers with `media` events carrying
//! base64 µ-law audio addressed by stream identifier.

use serde::{Deserialize, Serialize};

/// Metadata attached to the `start` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    /// Provider call identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<String>,
    /// Stream identifier used to address outbound media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_sid: Option<String>,
}

/// Audio block carried by a `media` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded µ-law audio
    pub payload: String,
}

/// Media-stream events, both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyMessage {
    /// Socket handshake notice
    Connected,

    /// Stream started
    Start {
        #[serde(default)]
        start: StartMetadata,
        #[serde(
            rename = "streamSid",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        stream_sid: Option<String>,
    },

    /// One slice of audio
    Media {
        #[serde(
            rename = "streamSid",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        stream_sid: Option<String>,
        media: MediaPayload,
    },

    /// Playback marker
    Mark,

    /// Stream ended
    Stop,

    /// Anything else
    #[serde(other)]
    Unknown,
}

impl TelephonyMessage {
    /// Outbound audio frame for `stream_sid`.
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TelephonyMessage::Media {
            stream_sid: Some(stream_sid.into()),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }
}

/// What the bridge asks the telephony writer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyOutbound {
    /// Send one event as a JSON text frame
    Message(TelephonyMessage),
    /// Close the connection; always the last request
    Close,
}
