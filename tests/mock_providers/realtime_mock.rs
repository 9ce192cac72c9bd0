//! WebSocket Mock Server for the realtime speech endpoint
//!
//! Records every client event and answers the first audio append with one
//! scripted turn: a caller transcription, assistant text, and 20ms of audio.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Caller words reported by the mock
pub const MOCK_CALLER_TEXT: &str = "I'd like to book a table";

/// Assistant reply reported by the mock
pub const MOCK_ASSISTANT_TEXT: &str = "Of course! For how many people?";

/// PCM16 bytes in the scripted audio delta (160 samples)
pub const MOCK_AUDIO_BYTES: usize = 320;

/// Realtime Mock Server State
#[derive(Default)]
pub struct RealtimeMockState {
    /// Every client event, in arrival order, across connections
    pub received: Mutex<Vec<Value>>,
    pub connection_count: AtomicU64,
}

impl RealtimeMockState {
    pub fn received_types(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| event["type"].as_str().map(str::to_string))
            .collect()
    }
}

pub struct RealtimeMockServer {
    pub addr: SocketAddr,
    pub state: Arc<RealtimeMockState>,
    task: JoinHandle<()>,
}

impl RealtimeMockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock realtime server");
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(RealtimeMockState::default());

        let accept_state = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_realtime_connection(stream, state).await {
                        eprintln!("Mock realtime connection error: {}", e);
                    }
                });
            }
        });

        Self { addr, state, task }
    }

    /// Endpoint URL without the model parameter
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }
}

impl Drop for RealtimeMockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn scripted_turn() -> Vec<Value> {
    let audio = BASE64_STANDARD.encode(vec![0u8; MOCK_AUDIO_BYTES]);
    vec![
        json!({"type": "session.created", "session": {"id": "sess_mock"}}),
        json!({"type": "response.input_audio_transcription.delta", "delta": MOCK_CALLER_TEXT}),
        json!({"type": "response.input_audio_transcription.completed"}),
        json!({"type": "response.output_text.delta", "delta": MOCK_ASSISTANT_TEXT}),
        json!({"type": "response.output_audio.delta", "audio": audio}),
        json!({"type": "response.output_text.completed"}),
    ]
}

/// Handle a single realtime session
async fn handle_realtime_connection(
    stream: TcpStream,
    state: Arc<RealtimeMockState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    state.connection_count.fetch_add(1, Ordering::Relaxed);
    let mut replied = false;

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(event) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let event_type = event["type"].as_str().unwrap_or_default().to_string();
                state.received.lock().unwrap().push(event);

                match event_type.as_str() {
                    "input_audio_buffer.append" if !replied => {
                        replied = true;
                        for reply in scripted_turn() {
                            write.send(Message::Text(reply.to_string().into())).await?;
                        }
                    }
                    "response.create" => {
                        let done = json!({"type": "response.completed"});
                        write.send(Message::Text(done.to_string().into())).await?;
                    }
                    _ => {}
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                write.send(Message::Pong(data)).await?;
            }
            Err(e) => {
                eprintln!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
