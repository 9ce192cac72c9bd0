pub mod audio;
pub mod bridge;
pub mod realtime;
pub mod speech;
pub mod transcript;

// Re-export commonly used types for convenience
pub use bridge::{
    BridgeConfig, BridgeError, BridgeFactory, BridgeHandle, ShutdownReason, TelephonyMessage,
    TelephonyOutbound, VoiceBridge,
};

pub use realtime::{
    ClientEvent, OpenAIRealtimeConfig, OpenAIRealtimeConnector, RealtimeConnector, RealtimeError,
    RealtimeResult, ServerEvent,
};

pub use speech::{SpeechClient, SpeechError};

pub use transcript::{SessionLogger, Speaker, TranscriptEntry};
