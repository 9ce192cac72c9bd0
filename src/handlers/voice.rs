//! Call-setup webhook.
//!
//! The telephony provider POSTs here when a call arrives. The reply is a
//! markup document that greets the caller and opens a media stream to
//! [`STREAM_PATH`](crate::routes::STREAM_PATH).

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::routes::STREAM_PATH;
use crate::state::AppState;

/// Spoken while the media stream initializes
pub const DEFAULT_GREETING: &str = "Hi there! Thanks for calling. How can I assist you today?";

const GREETING_VOICE: &str = "Polly.Joanna";
const GREETING_LANGUAGE: &str = "en-US";
const STREAM_TRACK: &str = "inbound_track";
const STREAM_NAME: &str = "customer-audio";

/// Media stream URL for a public base URL.
pub fn stream_url(public_base_url: &str) -> String {
    format!("{}{}", public_base_url.trim_end_matches('/'), STREAM_PATH)
}

/// Escape text for use in XML content and attribute values.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the call-setup document.
pub fn render_voice_response(stream_url: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<Response>"#,
            r#"<Say voice="{voice}" language="{language}">{greeting}</Say>"#,
            r#"<Connect><Stream url="{url}" track="{track}" name="{name}"/></Connect>"#,
            r#"</Response>"#
        ),
        voice = GREETING_VOICE,
        language = GREETING_LANGUAGE,
        greeting = xml_escape(DEFAULT_GREETING),
        url = xml_escape(stream_url),
        track = STREAM_TRACK,
        name = STREAM_NAME,
    )
}

/// `POST /voice`
pub async fn voice_webhook(State(state): State<Arc<AppState>>) -> Response {
    let Some(base_url) = state.config.public_base_url.as_deref() else {
        error!("Voice webhook called but PUBLIC_BASE_URL is not set");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server misconfigured: PUBLIC_BASE_URL is not set.",
        )
            .into_response();
    };

    let url = stream_url(base_url);
    info!(stream_url = %url, "Answering incoming call");

    (
        [(header::CONTENT_TYPE, "text/xml")],
        render_voice_response(&url),
    )
        .into_response()
}
