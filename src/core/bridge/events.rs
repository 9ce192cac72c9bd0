//! Typed event union consumed by the bridge loop.

use std::fmt;

use tokio::sync::mpsc;

use crate::core::realtime::{ClientEvent, ServerEvent};

/// Input from the telephony connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonySignal {
    /// Raw text frame
    Message(String),
    /// Connection closed
    Closed,
    /// Transport error
    Error(String),
}

/// Input from the companion realtime connection.
#[derive(Debug)]
pub enum CompanionSignal {
    /// Session is open; outbound events go to this sender
    Ready(mpsc::Sender<ClientEvent>),
    /// Parsed server event
    Event(ServerEvent),
    /// Connection could not be opened
    ConnectFailed(String),
    /// Transport error
    Error(String),
    /// Connection closed
    Closed,
}

/// Everything the bridge reacts to, in arrival order.
#[derive(Debug)]
pub enum BridgeEvent {
    Telephony(TelephonySignal),
    Companion(CompanionSignal),
}

/// Why a bridge shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    TelephonyStop,
    TelephonyClosed,
    TelephonyError,
    RealtimeConnectFailed,
    RealtimeError,
    RealtimeClosed,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::TelephonyStop => "telephony-stop",
            ShutdownReason::TelephonyClosed => "telephony-closed",
            ShutdownReason::TelephonyError => "telephony-error",
            ShutdownReason::RealtimeConnectFailed => "realtime-connect-failed",
            ShutdownReason::RealtimeError => "realtime-error",
            ShutdownReason::RealtimeClosed => "realtime-closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
