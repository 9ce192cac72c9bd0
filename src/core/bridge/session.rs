//! Per-call session record.

use crate::core::transcript::Speaker;

/// Which in-progress utterance a text delta belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Customer,
    Assistant,
}

impl Channel {
    pub fn speaker(self) -> Speaker {
        match self {
            Channel::Customer => Speaker::Customer,
            Channel::Assistant => Speaker::Assistant,
        }
    }
}

/// In-progress text for each channel.
#[derive(Debug, Default)]
pub struct TranscriptBuffers {
    customer: String,
    assistant: String,
}

impl TranscriptBuffers {
    fn buffer_mut(&mut self, channel: Channel) -> &mut String {
        match channel {
            Channel::Customer => &mut self.customer,
            Channel::Assistant => &mut self.assistant,
        }
    }

    pub fn append(&mut self, channel: Channel, delta: &str) {
        self.buffer_mut(channel).push_str(delta);
    }

    /// Clear the channel, returning its trimmed text unless it was blank.
    pub fn take(&mut self, channel: Channel) -> Option<String> {
        let text = std::mem::take(self.buffer_mut(channel));
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Identity and turn state of one bridged call.
#[derive(Debug)]
pub struct CallSession {
    /// Locally generated, stable for the connection's lifetime
    pub session_id: String,
    pub call_sid: Option<String>,
    pub stream_sid: Option<String>,
    /// A response has been requested and not yet completed
    pub awaiting_response: bool,
    pub transcripts: TranscriptBuffers,
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            call_sid: None,
            stream_sid: None,
            awaiting_response: false,
            transcripts: TranscriptBuffers::default(),
        }
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}
