//! One-shot speech synthesis.
//!
//! - Endpoint: `POST https://api.openai.com/v1/audio/speech`
//! - Model: gpt-4o-mini-tts
//! - Output: whatever container the caller asks for (mp3, wav, ogg, ...)

use bytes::Bytes;
use serde_json::json;
use thiserror::Error;
use zeroize::Zeroize;

/// OpenAI speech synthesis endpoint
pub const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Model used for synthesis
pub const SPEECH_MODEL: &str = "gpt-4o-mini-tts";

pub const DEFAULT_SPEECH_VOICE: &str = "verse";
pub const DEFAULT_SPEECH_FORMAT: &str = "mp3";

/// Errors from the synthesis endpoint.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Speech endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// MIME type served for an output format.
pub fn audio_mime_type(format: &str) -> &'static str {
    match format {
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        _ => "audio/mpeg",
    }
}

/// Client for the synthesis endpoint.
#[derive(Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl SpeechClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            url: OPENAI_SPEECH_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn build_request(&self, text: &str, voice: &str, format: &str) -> reqwest::RequestBuilder {
        let body = json!({
            "model": SPEECH_MODEL,
            "input": text,
            "voice": voice,
            "response_format": format,
        });

        self.http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
    }

    /// Synthesize `text` and return the encoded audio.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        format: &str,
    ) -> Result<Bytes, SpeechError> {
        let response = self.build_request(text, voice, format).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?)
    }
}

impl std::fmt::Debug for SpeechClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechClient")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

impl Drop for SpeechClient {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
