//! Telephony to realtime speech bridge.
//!
//! One [`VoiceBridge`] owns one call. It consumes telephony control and media
//! events plus the companion realtime connection's events from a single
//! channel, so all session state is mutated from one task in arrival order.
//!
//! # Lifecycle
//!
//! `Created -> AwaitingStart -> Active -> Closed`
//!
//! - `start` records the call and stream identifiers and opens the companion
//!   connection in the background.
//! - Once the companion is ready, a session configuration is sent before any
//!   audio.
//! - Every inbound `media` frame is decoded to PCM16, appended to the remote
//!   input buffer and restarts the silence timer. When the timer fires with
//!   no response in flight, the buffer is committed and a response requested.
//! - Synthesized audio is re-encoded to µ-law and sent back in 160-sample
//!   frames addressed to the stream identifier.
//! - `stop`, or either connection closing or failing, shuts the bridge down
//!   exactly once and writes the transcript.
//!
//! # Example
//!
//! ```rust,ignore
//! let (telephony_tx, telephony_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
//! let (bridge, handle) = factory.create(telephony_tx)?;
//! tokio::spawn(pump_socket_into(handle));
//! let transcript = bridge.run().await;
//! ```

mod events;
mod session;
mod telephony;
mod voice_bridge;


use thiserror::Error;

use crate::core::realtime::RealtimeError;

pub use events::{BridgeEvent, CompanionSignal, ShutdownReason, TelephonySignal};
pub use session::{CallSession, Channel, TranscriptBuffers};
pub use telephony::{MediaPayload, StartMetadata, TelephonyMessage, TelephonyOutbound};
pub use voice_bridge::{
    BridgeConfig, BridgeFactory, BridgeHandle, BridgePhase, CHANNEL_BUFFER_SIZE,
    DEFAULT_SILENCE_TIMEOUT, VoiceBridge,
};

/// Errors raised while constructing a bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No speech-endpoint credential is configured
    #[error("OPENAI_API_KEY must be set before handling calls")]
    MissingCredential,

    /// The realtime connector rejected its configuration
    #[error("Realtime connector error: {0}")]
    Realtime(#[from] RealtimeError),
}
