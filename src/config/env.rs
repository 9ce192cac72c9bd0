//! Environment variable loading.

use std::env;
use std::str::FromStr;

/// Raw values read from the process environment, before merging.
#[derive(Debug, Default)]
pub(super) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    pub public_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub silence_timeout_ms: Option<u64>,
    pub transcript_dir: Option<String>,
    pub realtime_model: Option<String>,
    pub realtime_voice: Option<String>,
    pub realtime_url: Option<String>,
}

impl EnvConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            host: env_string("HOST"),
            port: env_parse("PORT")?,
            tls_cert_path: env_string("TLS_CERT_PATH"),
            tls_key_path: env_string("TLS_KEY_PATH"),
            public_base_url: env_string("PUBLIC_BASE_URL"),
            openai_api_key: env_string("OPENAI_API_KEY"),
            silence_timeout_ms: env_parse("SILENCE_TIMEOUT_MS")?,
            transcript_dir: env_string("TRANSCRIPT_DIR"),
            realtime_model: env_string("OPENAI_REALTIME_MODEL"),
            realtime_voice: env_string("OPENAI_REALTIME_VOICE"),
            realtime_url: env_string("OPENAI_REALTIME_URL"),
        })
    }
}

/// Non-empty value of `name`, trimmed.
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}").into()),
        None => Ok(None),
    }
}
