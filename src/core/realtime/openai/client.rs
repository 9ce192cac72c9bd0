//! Realtime endpoint WebSocket connector.
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: PCM 16-bit, 8kHz, mono, little-endian, base64 encoded
//!
//! Each successful [`RealtimeConnector::connect`] spawns one I/O task that
//! owns the socket. The task writes every [`ClientEvent`] received on the
//! command channel as a JSON text frame and forwards every parsed
//! [`ServerEvent`] to the events channel. Closing the command channel makes
//! the task send a close frame and exit. If the events receiver goes away
//! first, the task stops reading but still writes queued commands, so a
//! final `session.close` reaches the endpoint before the close frame.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

use super::config::{OPENAI_BETA_HEADER, OpenAIRealtimeConfig};
use super::messages::{ClientEvent, ServerEvent};
use crate::core::realtime::base::{
    RealtimeConnector, RealtimeError, RealtimeLink, RealtimeResult, RealtimeSignal,
};

/// Channel capacity for both directions of a session.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Connector for the hosted realtime speech endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    config: OpenAIRealtimeConfig,
}

impl OpenAIRealtimeConnector {
    pub fn new(config: OpenAIRealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Build the upgrade request with bearer and protocol-version headers.
    fn build_request(&self) -> RealtimeResult<tungstenite::handshake::client::Request> {
        let url = self.config.ws_url();
        let mut request = url.as_str().into_client_request().map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("Invalid realtime URL {url}: {e}"))
        })?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| {
                RealtimeError::InvalidConfiguration("API key is not a valid header".to_string())
            })?;

        let headers = request.headers_mut();
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_BETA_HEADER));
        Ok(request)
    }
}

#[async_trait]
impl RealtimeConnector for OpenAIRealtimeConnector {
    async fn connect(&self) -> RealtimeResult<RealtimeLink> {
        let request = self.build_request()?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(response)
                    if response.status() == StatusCode::UNAUTHORIZED =>
                {
                    RealtimeError::AuthenticationFailed("endpoint rejected credential".to_string())
                }
                other => RealtimeError::ConnectionFailed(other.to_string()),
            })?;

        info!(model = %self.config.model, "Connected to realtime endpoint");

        let (commands_tx, mut commands_rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel::<RealtimeSignal>(WS_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let (mut ws_sink, mut ws_stream) = ws_stream.split();
            let mut reading = true;

            loop {
                tokio::select! {
                    command = commands_rx.recv() => {
                        let Some(event) = command else {
                            debug!("Command channel closed, closing realtime socket");
                            if let Err(e) = ws_sink.send(Message::Close(None)).await {
                                debug!("Failed to send close frame: {}", e);
                            }
                            break;
                        };

                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize {}: {}", event.event_type(), e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send realtime message: {}", e);
                            let _ = events_tx.send(RealtimeSignal::Error(e.to_string())).await;
                            break;
                        }
                    }

                    incoming = ws_stream.next(), if reading => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        if events_tx.send(RealtimeSignal::Event(event)).await.is_err() {
                                            debug!("Event receiver dropped, draining queued commands");
                                            reading = false;
                                        }
                                    }
                                    Err(e) => {
                                        warn!("Failed to parse realtime event: {} - {}", e, text);
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("Realtime socket closed by server: {:?}", frame);
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("Realtime socket error: {}", e);
                                let _ = events_tx.send(RealtimeSignal::Error(e.to_string())).await;
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            debug!("Realtime I/O task finished");
        });

        Ok(RealtimeLink {
            commands: commands_tx,
            events: events_rx,
        })
    }
}
