//! Telephony media stream WebSocket handler
//!
//! Each accepted connection gets exactly one [`VoiceBridge`]. The socket is
//! split: a writer task drains [`TelephonyOutbound`] requests from the bridge,
//! and a reader task feeds inbound frames into the bridge's handle. The
//! bridge itself runs on the connection task until it shuts down.
//!
//! [`VoiceBridge`]: crate::core::bridge::VoiceBridge

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::bridge::{BridgeHandle, CHANNEL_BUFFER_SIZE, TelephonyOutbound};
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Close reason sent when no bridge can be built for the connection
pub const BRIDGE_UNAVAILABLE_REASON: &str = "Unable to establish realtime session.";

/// Media stream WebSocket handler
///
/// Upgrades the HTTP connection and binds it to a new voice bridge.
pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("Telephony media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_stream_socket(socket, state))
}

async fn handle_stream_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (mut sender, receiver) = socket.split();
    let (telephony_tx, mut telephony_rx) = mpsc::channel::<TelephonyOutbound>(CHANNEL_BUFFER_SIZE);

    let (bridge, handle) = match app_state.bridges.create(telephony_tx) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Unable to initialise voice bridge: {}", e);
            let frame = CloseFrame {
                code: close_code::ERROR,
                reason: BRIDGE_UNAVAILABLE_REASON.into(),
            };
            if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                debug!("Failed to send close frame: {}", e);
            }
            return;
        }
    };

    let session_id = bridge.session_id().to_string();
    info!(session_id = %session_id, "Telephony media stream connected");

    // Sender task for outgoing frames; ends after a close request or once the
    // bridge drops its sender.
    let writer_task = tokio::spawn(async move {
        while let Some(outbound) = telephony_rx.recv().await {
            let should_close = matches!(outbound, TelephonyOutbound::Close);

            let result = match outbound {
                TelephonyOutbound::Message(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize telephony message: {}", e);
                        continue;
                    }
                },
                TelephonyOutbound::Close => sender.send(Message::Close(None)).await,
            };

            if let Err(e) = result {
                warn!("Failed to send telephony frame: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let reader_task = tokio::spawn(pump_inbound(receiver, handle));

    let transcript = bridge.run().await;

    reader_task.abort();
    if let Err(e) = writer_task.await {
        debug!("Telephony writer task ended abnormally: {}", e);
    }

    info!(
        session_id = %session_id,
        transcript = ?transcript,
        "Telephony media stream finished"
    );
}

/// Feed inbound frames to the bridge until the socket or the bridge goes away.
async fn pump_inbound(mut receiver: futures::stream::SplitStream<WebSocket>, handle: BridgeHandle) {
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !handle.telephony_message(text.as_str()).await {
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(frame = ?frame, "Telephony peer sent close");
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary frame on media stream");
            }
            // Pings are answered by the WebSocket layer.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                warn!("Telephony WebSocket error: {}", e);
                handle.telephony_error(e.to_string()).await;
                return;
            }
        }
    }

    handle.telephony_closed().await;
}
