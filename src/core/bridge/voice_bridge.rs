//! The per-call bridge state machine.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, WeakSender, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, warn};

use super::BridgeError;
use super::events::{BridgeEvent, CompanionSignal, ShutdownReason, TelephonySignal};
use super::session::{CallSession, Channel};
use super::telephony::{TelephonyMessage, TelephonyOutbound};
use crate::core::audio::{FRAME_SAMPLES, decode_frame, encode_frames};
use crate::core::realtime::openai::{RECEPTIONIST_INSTRUCTIONS, SessionConfig};
use crate::core::realtime::{
    ClientEvent, OpenAIRealtimeConfig, OpenAIRealtimeConnector, OpenAIRealtimeVoice,
    RealtimeConnector, RealtimeLink, RealtimeSignal, ServerEvent,
};
use crate::core::transcript::{DEFAULT_TRANSCRIPT_DIR, SessionLogger, Speaker, TranscriptEntry};

/// Channel buffer size for bridge events and telephony output.
pub const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Default quiet period before the input buffer is committed.
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(900);

/// Per-call bridge settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Quiet period after the last inbound media before a commit
    pub silence_timeout: Duration,
    /// Where transcripts are written
    pub transcript_dir: PathBuf,
    /// Voice declared in the session configuration
    pub voice: OpenAIRealtimeVoice,
    /// Persona declared in the session configuration
    pub instructions: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            transcript_dir: PathBuf::from(DEFAULT_TRANSCRIPT_DIR),
            voice: OpenAIRealtimeVoice::default(),
            instructions: RECEPTIONIST_INSTRUCTIONS.to_string(),
        }
    }
}

/// Lifecycle of a bridge. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    Created,
    AwaitingStart,
    Active,
    Closed,
}

enum Companion {
    NotStarted,
    Connecting(JoinHandle<()>),
    Ready {
        commands: mpsc::Sender<ClientEvent>,
        task: JoinHandle<()>,
    },
    Gone,
}

/// Builds bridges for accepted telephony connections.
#[derive(Clone)]
pub struct BridgeFactory {
    config: BridgeConfig,
    connector: Option<Arc<dyn RealtimeConnector>>,
}

impl BridgeFactory {
    /// `connector` is `None` when no speech credential is configured.
    pub fn new(config: BridgeConfig, connector: Option<Arc<dyn RealtimeConnector>>) -> Self {
        Self { config, connector }
    }

    /// Factory backed by the hosted realtime endpoint. `realtime` is `None`
    /// when no credential is configured; calls are then refused.
    pub fn openai(
        config: BridgeConfig,
        realtime: Option<OpenAIRealtimeConfig>,
    ) -> Result<Self, BridgeError> {
        let connector = match realtime {
            Some(realtime) => {
                let connector: Arc<dyn RealtimeConnector> =
                    Arc::new(OpenAIRealtimeConnector::new(realtime)?);
                Some(connector)
            }
            None => None,
        };
        Ok(Self::new(config, connector))
    }

    pub fn has_credential(&self) -> bool {
        self.connector.is_some()
    }

    /// Create a bridge bound to a telephony writer.
    pub fn create(
        &self,
        telephony: mpsc::Sender<TelephonyOutbound>,
    ) -> Result<(VoiceBridge, BridgeHandle), BridgeError> {
        let connector = self
            .connector
            .clone()
            .ok_or(BridgeError::MissingCredential)?;
        Ok(VoiceBridge::new(connector, self.config.clone(), telephony))
    }
}

/// Feeds telephony input into a running bridge.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    events: mpsc::Sender<BridgeEvent>,
}

impl BridgeHandle {
    /// Returns `false` once the bridge has shut down.
    pub async fn telephony_message(&self, text: impl Into<String>) -> bool {
        self.send(TelephonySignal::Message(text.into())).await
    }

    pub async fn telephony_closed(&self) -> bool {
        self.send(TelephonySignal::Closed).await
    }

    pub async fn telephony_error(&self, error: impl Into<String>) -> bool {
        self.send(TelephonySignal::Error(error.into())).await
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    async fn send(&self, signal: TelephonySignal) -> bool {
        self.events
            .send(BridgeEvent::Telephony(signal))
            .await
            .is_ok()
    }
}

enum Step {
    Event(Option<BridgeEvent>),
    CommitDue,
}

/// One call's bridge between the telephony leg and the realtime endpoint.
///
/// All input arrives on a single channel and is handled one event at a time,
/// so session state is never touched concurrently.
pub struct VoiceBridge {
    config: BridgeConfig,
    connector: Arc<dyn RealtimeConnector>,
    session: CallSession,
    logger: SessionLogger,
    phase: BridgePhase,
    companion: Companion,
    telephony: mpsc::Sender<TelephonyOutbound>,
    telephony_open: bool,
    events_rx: mpsc::Receiver<BridgeEvent>,
    // Weak so the channel closes once every handle is gone.
    events_tx: WeakSender<BridgeEvent>,
    commit_timer: Option<Pin<Box<Sleep>>>,
    transcript_path: Option<PathBuf>,
}

impl VoiceBridge {
    pub fn new(
        connector: Arc<dyn RealtimeConnector>,
        config: BridgeConfig,
        telephony: mpsc::Sender<TelephonyOutbound>,
    ) -> (Self, BridgeHandle) {
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let session = CallSession::new();
        let logger = SessionLogger::new(&config.transcript_dir, &session.session_id);

        let bridge = Self {
            config,
            connector,
            session,
            logger,
            phase: BridgePhase::Created,
            companion: Companion::NotStarted,
            telephony,
            telephony_open: true,
            events_rx,
            events_tx: events_tx.downgrade(),
            commit_timer: None,
            transcript_path: None,
        };

        (bridge, BridgeHandle { events: events_tx })
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn phase(&self) -> BridgePhase {
        self.phase
    }

    /// Process events until shutdown. Returns the transcript path if one was written.
    pub async fn run(mut self) -> Option<PathBuf> {
        self.phase = BridgePhase::AwaitingStart;
        debug!(session_id = %self.session.session_id, "Voice bridge waiting for start");

        while self.phase != BridgePhase::Closed {
            let step = tokio::select! {
                event = self.events_rx.recv() => Step::Event(event),
                _ = commit_deadline(&mut self.commit_timer) => Step::CommitDue,
            };

            match step {
                Step::Event(Some(event)) => self.handle_event(event).await,
                Step::Event(None) => {
                    self.telephony_open = false;
                    self.shutdown(ShutdownReason::TelephonyClosed).await;
                }
                Step::CommitDue => {
                    self.commit_timer = None;
                    self.flush_input_buffer();
                }
            }
        }

        self.transcript_path.take()
    }

    async fn handle_event(&mut self, event: BridgeEvent) {
        if self.phase == BridgePhase::Closed {
            return;
        }

        match event {
            BridgeEvent::Telephony(TelephonySignal::Message(text)) => {
                self.handle_telephony_message(&text).await;
            }
            BridgeEvent::Telephony(TelephonySignal::Closed) => {
                self.telephony_open = false;
                self.shutdown(ShutdownReason::TelephonyClosed).await;
            }
            BridgeEvent::Telephony(TelephonySignal::Error(e)) => {
                error!(session_id = %self.session.session_id, "Telephony socket error: {}", e);
                self.shutdown(ShutdownReason::TelephonyError).await;
            }
            BridgeEvent::Companion(signal) => self.handle_companion_signal(signal).await,
        }
    }

    async fn handle_telephony_message(&mut self, text: &str) {
        let message = match serde_json::from_str::<TelephonyMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    session_id = %self.session.session_id,
                    "Failed to parse telephony message: {}", e
                );
                return;
            }
        };

        match message {
            TelephonyMessage::Start { start, stream_sid } => {
                self.on_call_start(start.call_sid, start.stream_sid.or(stream_sid));
            }
            TelephonyMessage::Media { media, .. } => self.on_media(&media.payload),
            TelephonyMessage::Stop => self.shutdown(ShutdownReason::TelephonyStop).await,
            TelephonyMessage::Connected | TelephonyMessage::Mark | TelephonyMessage::Unknown => {}
        }
    }

    fn on_call_start(&mut self, call_sid: Option<String>, stream_sid: Option<String>) {
        if self.phase != BridgePhase::AwaitingStart {
            warn!(
                session_id = %self.session.session_id,
                "Ignoring repeated start event"
            );
            return;
        }

        let call_sid = call_sid.unwrap_or_else(|| self.session.session_id.clone());
        self.logger.push(TranscriptEntry::new(
            Speaker::System,
            format!("Call connected ({call_sid})."),
        ));

        info!(
            session_id = %self.session.session_id,
            call_sid = %call_sid,
            stream_sid = ?stream_sid,
            "Call started"
        );

        self.session.call_sid = Some(call_sid);
        self.session.stream_sid = stream_sid;
        self.phase = BridgePhase::Active;
        self.connect_companion();
    }

    /// Open the companion connection in the background. At most once per call.
    fn connect_companion(&mut self) {
        if !matches!(self.companion, Companion::NotStarted) {
            return;
        }

        let connector = self.connector.clone();
        let events = self.events_tx.clone();
        let task = tokio::spawn(run_companion(connector, events));
        self.companion = Companion::Connecting(task);
    }

    fn on_media(&mut self, payload: &str) {
        if self.phase != BridgePhase::Active {
            return;
        }
        let Companion::Ready { commands, .. } = &self.companion else {
            return;
        };

        let pcm = match decode_frame(payload) {
            Ok(pcm) => pcm,
            Err(e) => {
                warn!(session_id = %self.session.session_id, "Dropping media frame: {}", e);
                return;
            }
        };

        let commands = commands.clone();
        self.send_to_companion(&commands, ClientEvent::audio_append(&pcm));
        self.schedule_commit();
    }

    /// Restart the silence timer unless a response is in flight.
    fn schedule_commit(&mut self) {
        if self.session.awaiting_response {
            return;
        }
        self.commit_timer = Some(Box::pin(sleep(self.config.silence_timeout)));
    }

    /// Commit buffered input and request a response.
    fn flush_input_buffer(&mut self) {
        if self.session.awaiting_response {
            return;
        }
        let Companion::Ready { commands, .. } = &self.companion else {
            return;
        };

        let commands = commands.clone();
        self.commit_timer = None;
        self.session.awaiting_response = true;

        debug!(session_id = %self.session.session_id, "Silence detected, committing input");
        self.send_to_companion(&commands, ClientEvent::InputAudioBufferCommit);
        self.send_to_companion(&commands, ClientEvent::response_create());
    }

    async fn handle_companion_signal(&mut self, signal: CompanionSignal) {
        match signal {
            CompanionSignal::Ready(commands) => self.on_companion_ready(commands),
            CompanionSignal::Event(event) => self.on_server_event(event),
            CompanionSignal::ConnectFailed(e) => {
                error!(
                    session_id = %self.session.session_id,
                    "Failed to open realtime session: {}", e
                );
                self.companion = Companion::Gone;
                self.shutdown(ShutdownReason::RealtimeConnectFailed).await;
            }
            CompanionSignal::Error(e) => {
                error!(session_id = %self.session.session_id, "Realtime socket error: {}", e);
                self.companion = Companion::Gone;
                self.shutdown(ShutdownReason::RealtimeError).await;
            }
            CompanionSignal::Closed => {
                self.companion = Companion::Gone;
                self.shutdown(ShutdownReason::RealtimeClosed).await;
            }
        }
    }

    fn on_companion_ready(&mut self, commands: mpsc::Sender<ClientEvent>) {
        let task = match std::mem::replace(&mut self.companion, Companion::Gone) {
            Companion::Connecting(task) => task,
            other => {
                self.companion = other;
                return;
            }
        };

        let session = SessionConfig::for_telephony(
            self.config.voice.as_str(),
            self.config.instructions.clone(),
        );
        self.send_to_companion(&commands, ClientEvent::SessionUpdate { session });
        self.companion = Companion::Ready { commands, task };

        self.logger.push(TranscriptEntry::new(
            Speaker::System,
            "OpenAI realtime session established.",
        ));
        info!(session_id = %self.session.session_id, "Realtime session established");
    }

    fn on_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::OutputTextDelta { delta } => {
                self.session.transcripts.append(Channel::Assistant, &delta);
            }
            ServerEvent::OutputTextCompleted => self.flush_transcript(Channel::Assistant),
            ServerEvent::InputTranscriptionDelta { delta } => {
                self.session.transcripts.append(Channel::Customer, &delta);
            }
            ServerEvent::InputTranscriptionCompleted => self.flush_transcript(Channel::Customer),
            ServerEvent::OutputAudioDelta { audio } => self.relay_audio(&audio),
            ServerEvent::ResponseCompleted => {
                self.flush_transcript(Channel::Assistant);
                self.session.awaiting_response = false;
            }
            ServerEvent::Error { .. } | ServerEvent::ResponseError { .. } => {
                error!(
                    session_id = %self.session.session_id,
                    "Realtime endpoint reported error: {}",
                    event.error_details().unwrap_or_default()
                );
            }
            ServerEvent::Unknown => {}
        }
    }

    fn flush_transcript(&mut self, channel: Channel) {
        if let Some(text) = self.session.transcripts.take(channel) {
            self.logger.push(TranscriptEntry::new(channel.speaker(), text));
        }
    }

    /// Re-encode synthesized PCM and send it to the caller in 20ms frames.
    fn relay_audio(&mut self, pcm_base64: &str) {
        if pcm_base64.is_empty() || !self.telephony_open {
            return;
        }
        let Some(stream_sid) = self.session.stream_sid.clone() else {
            warn!(
                session_id = %self.session.session_id,
                "Dropping audio delta: stream identifier unknown"
            );
            return;
        };

        let frames = match encode_frames(pcm_base64, FRAME_SAMPLES) {
            Ok(frames) => frames,
            Err(e) => {
                warn!(session_id = %self.session.session_id, "Dropping audio delta: {}", e);
                return;
            }
        };

        for payload in frames {
            let outbound = TelephonyOutbound::Message(TelephonyMessage::media(&stream_sid, payload));
            if let Err(e) = self.telephony.try_send(outbound) {
                warn!(
                    session_id = %self.session.session_id,
                    "Failed to queue telephony frame: {}", e
                );
                if matches!(e, TrySendError::Closed(_)) {
                    self.telephony_open = false;
                    return;
                }
            }
        }
    }

    fn send_to_companion(&self, commands: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
        let event_type = event.event_type();
        if let Err(e) = commands.try_send(event) {
            warn!(
                session_id = %self.session.session_id,
                "Failed to queue {}: {}", event_type, e
            );
        }
    }

    /// Tear the call down. Runs once; later calls are no-ops.
    pub(super) async fn shutdown(&mut self, reason: ShutdownReason) {
        if self.phase == BridgePhase::Closed {
            return;
        }
        self.phase = BridgePhase::Closed;
        self.commit_timer = None;

        info!(
            session_id = %self.session.session_id,
            call_sid = ?self.session.call_sid,
            reason = %reason,
            "Shutting down voice bridge"
        );

        self.logger.push(TranscriptEntry::new(
            Speaker::System,
            format!("Shutting down voice bridge ({reason})."),
        ));
        self.flush_transcript(Channel::Customer);
        self.flush_transcript(Channel::Assistant);

        match self.logger.persist().await {
            Ok(Some(path)) => {
                info!(session_id = %self.session.session_id, path = %path.display(), "Transcript saved");
                self.transcript_path = Some(path);
            }
            Ok(None) => {}
            Err(e) => {
                error!(session_id = %self.session.session_id, "Failed to persist transcript: {}", e);
            }
        }

        match std::mem::replace(&mut self.companion, Companion::Gone) {
            Companion::Ready { commands, task } => {
                self.send_to_companion(&commands, ClientEvent::SessionClose);
                // Dropping the last command sender closes the socket after the queue drains.
                drop(commands);
                task.abort();
            }
            Companion::Connecting(task) => task.abort(),
            Companion::NotStarted | Companion::Gone => {}
        }

        if self.telephony_open {
            self.telephony_open = false;
            if let Err(e) = self.telephony.try_send(TelephonyOutbound::Close) {
                debug!(session_id = %self.session.session_id, "Telephony already closed: {}", e);
            }
        }
    }
}

/// Resolves when the commit timer fires; pending forever when none is set.
async fn commit_deadline(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(deadline) => deadline.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Forward a companion signal; `false` once the bridge is gone.
async fn forward(events: &WeakSender<BridgeEvent>, signal: CompanionSignal) -> bool {
    match events.upgrade() {
        Some(tx) => tx.send(BridgeEvent::Companion(signal)).await.is_ok(),
        None => false,
    }
}

async fn run_companion(connector: Arc<dyn RealtimeConnector>, events: WeakSender<BridgeEvent>) {
    let RealtimeLink {
        commands,
        events: mut signals,
    } = match connector.connect().await {
        Ok(link) => link,
        Err(e) => {
            forward(&events, CompanionSignal::ConnectFailed(e.to_string())).await;
            return;
        }
    };

    if !forward(&events, CompanionSignal::Ready(commands)).await {
        return;
    }

    while let Some(signal) = signals.recv().await {
        let signal = match signal {
            RealtimeSignal::Event(event) => CompanionSignal::Event(event),
            RealtimeSignal::Error(e) => CompanionSignal::Error(e),
        };
        if !forward(&events, signal).await {
            return;
        }
    }

    forward(&events, CompanionSignal::Closed).await;
}
