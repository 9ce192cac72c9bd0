//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `voice` - Call-setup webhook answered with stream markup
//! - `speech` - Text-to-speech helper route
//! - `stream` - Telephony media stream WebSocket bound to a voice bridge

pub mod api;
pub mod speech;
pub mod stream;
pub mod voice;

// Re-export commonly used handlers for convenient access
pub use stream::stream_handler;
pub use voice::voice_webhook;
