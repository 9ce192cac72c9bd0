//! Companion connection to the realtime speech endpoint.
//!
//! The bridge only sees the [`RealtimeConnector`] seam: one `connect` call per
//! call, returning a command sender and an event receiver. The hosted
//! endpoint implementation lives in [`openai`].

mod base;
pub mod openai;

pub use base::{RealtimeConnector, RealtimeError, RealtimeLink, RealtimeResult, RealtimeSignal};
pub use openai::{
    ClientEvent, OpenAIRealtimeConfig, OpenAIRealtimeConnector, OpenAIRealtimeModel,
    OpenAIRealtimeVoice, ServerEvent,
};
