//! Router assembly.
//!
//! # Endpoints
//!
//! - `GET /` - health check
//! - `POST /voice` - call-setup webhook
//! - `POST /generate-voice` - speech synthesis helper
//! - `GET /voice/stream` - telephony media stream WebSocket
//!
//! Any other path is answered with a bare 404. Upgrade attempts on unknown
//! paths additionally get `Connection: close`, so the transport is dropped.

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{api, speech, stream, voice};
use crate::state::AppState;

/// Fixed path of the media stream endpoint
pub const STREAM_PATH: &str = "/voice/stream";

/// Create the HTTP router with public routes
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/voice", post(voice::voice_webhook))
        .route("/generate-voice", post(speech::generate_voice))
        .layer(TraceLayer::new_for_http())
}

/// Create the media stream WebSocket router
///
/// # Protocol
///
/// The telephony provider sends JSON events (`connected`, `start`, `media`,
/// `mark`, `stop`). The server answers with `media` events carrying base64
/// µ-law audio and closes the socket when the call ends.
pub fn create_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(STREAM_PATH, get(stream::stream_handler))
        .layer(TraceLayer::new_for_http())
}

/// Complete application router
pub fn create_app(state: Arc<AppState>) -> Router {
    create_api_router()
        .merge(create_stream_router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri, headers: HeaderMap) -> Response {
    if headers.contains_key(header::UPGRADE) {
        warn!(path = %uri.path(), "Rejecting upgrade request for unknown path");
        return (
            StatusCode::NOT_FOUND,
            [(header::CONNECTION, HeaderValue::from_static("close"))],
        )
            .into_response();
    }

    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response()
}
