//! Connector seam for the companion speech endpoint.
//!
//! A connector opens one duplex session and hands back a [`RealtimeLink`]:
//! a command sender for outbound client events and a receiver of inbound
//! signals. The receiver ending means the endpoint went away.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::openai::messages::{ClientEvent, ServerEvent};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to the realtime endpoint.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Link Types
// =============================================================================

/// Something the endpoint connection produced.
#[derive(Debug, Clone)]
pub enum RealtimeSignal {
    /// A parsed server event
    Event(ServerEvent),
    /// Transport failure; the events channel closes right after
    Error(String),
}

/// Handles to one open realtime session.
#[derive(Debug)]
pub struct RealtimeLink {
    /// Outbound client events. Dropping every sender closes the session.
    pub commands: mpsc::Sender<ClientEvent>,
    /// Inbound signals in arrival order.
    pub events: mpsc::Receiver<RealtimeSignal>,
}

/// Opens sessions against a realtime speech endpoint.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Open one session. Called at most once per call; there is no retry.
    async fn connect(&self) -> RealtimeResult<RealtimeLink>;
}
