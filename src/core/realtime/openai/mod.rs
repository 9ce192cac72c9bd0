//! Hosted realtime speech endpoint.
//!
//! Audio in both directions is PCM 16-bit signed little-endian at 8kHz so the
//! telephony leg needs no resampling.

pub mod client;
pub mod config;
pub mod messages;

pub use client::OpenAIRealtimeConnector;
pub use config::{
    DEFAULT_RESPONSE_INSTRUCTIONS, OPENAI_BETA_HEADER, OPENAI_REALTIME_URL, OpenAIRealtimeConfig,
    OpenAIRealtimeModel, OpenAIRealtimeVoice, RECEPTIONIST_INSTRUCTIONS,
};
pub use messages::{
    ApiError, AudioFormat, ClientEvent, ErrorPayload, ResponseConfig, ServerEvent, SessionConfig,
};
