//! Text to speech helper route.

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::core::speech::{DEFAULT_SPEECH_FORMAT, DEFAULT_SPEECH_VOICE, audio_mime_type};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /generate-voice`
#[derive(Debug, Deserialize)]
pub struct GenerateVoiceRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_voice() -> String {
    DEFAULT_SPEECH_VOICE.to_string()
}

fn default_format() -> String {
    DEFAULT_SPEECH_FORMAT.to_string()
}

/// `POST /generate-voice`
///
/// Synthesizes `text` and returns the audio as a download.
pub async fn generate_voice(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateVoiceRequest>,
) -> AppResult<Response> {
    let text = request
        .text
        .as_deref()
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Provide the `text` field to synthesize speech.".to_string())
        })?;

    if request.format.is_empty() || !request.format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported audio format '{}'.",
            request.format
        )));
    }

    let client = state.speech.as_ref().ok_or_else(|| {
        AppError::with_details(
            "Unable to generate voice audio.",
            "OPENAI_API_KEY is not set",
        )
    })?;

    info!(
        voice = %request.voice,
        format = %request.format,
        chars = text.len(),
        "Generating voice audio"
    );

    let audio = client
        .synthesize(text, &request.voice, &request.format)
        .await
        .map_err(|e| AppError::with_details("Unable to generate voice audio.", e))?;

    let disposition = format!("attachment; filename=\"openai-voice.{}\"", request.format);
    Ok((
        [
            (header::CONTENT_TYPE, audio_mime_type(&request.format).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audio,
    )
        .into_response())
}
