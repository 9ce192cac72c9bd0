//! Configuration module for the voice bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//!
//! # Example
//! ```rust,no_run
//! use voice_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::bridge::BridgeConfig;
use crate::core::realtime::openai::{OPENAI_REALTIME_URL, RECEPTIONIST_INSTRUCTIONS};
use crate::core::realtime::{OpenAIRealtimeConfig, OpenAIRealtimeModel, OpenAIRealtimeVoice};
use crate::core::transcript::DEFAULT_TRANSCRIPT_DIR;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default silence commit timeout in milliseconds
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 900;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the voice bridge server:
/// - Server settings (host, port, TLS, public base URL)
/// - The OpenAI credential
/// - Voice bridge settings (silence timeout, transcript directory, model, voice)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Externally reachable base URL, used to build the media stream URL
    pub public_base_url: Option<String>,

    /// OpenAI API key for the realtime session and speech synthesis.
    /// Not required at load time; calls are refused without it.
    pub openai_api_key: Option<String>,

    // Bridge settings
    pub silence_timeout_ms: u64,
    pub transcript_dir: PathBuf,
    pub realtime_model: OpenAIRealtimeModel,
    pub realtime_voice: OpenAIRealtimeVoice,
    pub realtime_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: None,
            public_base_url: None,
            openai_api_key: None,
            silence_timeout_ms: DEFAULT_SILENCE_TIMEOUT_MS,
            transcript_dir: PathBuf::from(DEFAULT_TRANSCRIPT_DIR),
            realtime_model: OpenAIRealtimeModel::default(),
            realtime_voice: OpenAIRealtimeVoice::default(),
            realtime_url: OPENAI_REALTIME_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("public_base_url", &self.public_base_url)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("silence_timeout_ms", &self.silence_timeout_ms)
            .field("transcript_dir", &self.transcript_dir)
            .field("realtime_model", &self.realtime_model)
            .field("realtime_voice", &self.realtime_voice)
            .field("realtime_url", &self.realtime_url)
            .finish()
    }
}

/// Zeroize the credential when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at startup, so its values are already
    /// visible as environment variables here.
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed or only one of
    /// the two TLS paths is set.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge(env::EnvConfig::load()?, None)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Only one of the two TLS paths is set
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = merge(env::EnvConfig::load()?, Some(yaml_config))?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    /// Non-blank OpenAI key, if configured
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Per-call bridge settings
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            silence_timeout: self.silence_timeout(),
            transcript_dir: self.transcript_dir.clone(),
            voice: self.realtime_voice,
            instructions: RECEPTIONIST_INSTRUCTIONS.to_string(),
        }
    }

    /// Realtime connection settings, or `None` without a credential
    pub fn realtime_config(&self) -> Option<OpenAIRealtimeConfig> {
        let api_key = self.openai_api_key()?;
        Some(OpenAIRealtimeConfig {
            api_key: api_key.to_string(),
            url: self.realtime_url.clone(),
            model: self.realtime_model,
        })
    }
}

/// Merge environment values (base) with YAML overrides and validate.
fn merge(
    env: env::EnvConfig,
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let tls = server.tls.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let bridge = yaml.bridge.unwrap_or_default();
    let defaults = ServerConfig::default();

    let cert_path = tls.cert_path.or(env.tls_cert_path);
    let key_path = tls.key_path.or(env.tls_key_path);
    let tls = match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        }),
        (None, None) => None,
        _ => {
            return Err("TLS requires both TLS_CERT_PATH and TLS_KEY_PATH to be set".into());
        }
    };

    let model = bridge.model.or(env.realtime_model);
    let voice = bridge.voice.or(env.realtime_voice);

    Ok(ServerConfig {
        host: server.host.or(env.host).unwrap_or(defaults.host.clone()),
        port: server.port.or(env.port).unwrap_or(defaults.port),
        tls,
        public_base_url: server.public_base_url.or(env.public_base_url),
        openai_api_key: providers.openai_api_key.or(env.openai_api_key),
        silence_timeout_ms: bridge
            .silence_timeout_ms
            .or(env.silence_timeout_ms)
            .unwrap_or(defaults.silence_timeout_ms),
        transcript_dir: bridge
            .transcript_dir
            .or(env.transcript_dir)
            .map(PathBuf::from)
            .unwrap_or(defaults.transcript_dir.clone()),
        realtime_model: model
            .map(|m| OpenAIRealtimeModel::from_str_or_default(&m))
            .unwrap_or_default(),
        realtime_voice: voice
            .map(|v| OpenAIRealtimeVoice::from_str_or_default(&v))
            .unwrap_or_default(),
        realtime_url: bridge
            .realtime_url
            .or(env.realtime_url)
            .unwrap_or(defaults.realtime_url.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "PUBLIC_BASE_URL",
        "OPENAI_API_KEY",
        "SILENCE_TIMEOUT_MS",
        "TRANSCRIPT_DIR",
        "OPENAI_REALTIME_MODEL",
        "OPENAI_REALTIME_VOICE",
        "OPENAI_REALTIME_URL",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            for name in ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.address(), "0.0.0.0:3000");
        assert!(config.tls.is_none());
        assert!(config.public_base_url.is_none());
        assert!(config.openai_api_key().is_none());
        assert!(config.realtime_config().is_none());
        assert_eq!(config.silence_timeout(), Duration::from_millis(900));
        assert_eq!(config.transcript_dir, PathBuf::from("logs"));
        assert_eq!(config.realtime_model, OpenAIRealtimeModel::Gpt4oRealtimePreview);
        assert_eq!(config.realtime_voice, OpenAIRealtimeVoice::Verse);
        assert_eq!(config.realtime_url, "wss://api.openai.com/v1/realtime");
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "8080");
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("PUBLIC_BASE_URL", "https://voice.example.com");
            env::set_var("SILENCE_TIMEOUT_MS", "1500");
            env::set_var("TRANSCRIPT_DIR", "/tmp/transcripts");
            env::set_var("OPENAI_REALTIME_VOICE", "sage");
        }

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_api_key(), Some("sk-env"));
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://voice.example.com")
        );
        assert_eq!(config.silence_timeout(), Duration::from_millis(1500));
        assert_eq!(config.realtime_voice, OpenAIRealtimeVoice::Sage);

        let bridge = config.bridge_config();
        assert_eq!(bridge.silence_timeout, Duration::from_millis(1500));
        assert_eq!(bridge.transcript_dir, PathBuf::from("/tmp/transcripts"));
        assert_eq!(bridge.voice, OpenAIRealtimeVoice::Sage);

        let realtime = config.realtime_config().unwrap();
        assert_eq!(realtime.api_key, "sk-env");
        assert_eq!(
            realtime.ws_url(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_are_rejected() {
        cleanup_env_vars();

        unsafe {
            env::set_var("SILENCE_TIMEOUT_MS", "soon");
        }
        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("SILENCE_TIMEOUT_MS"));

        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "99999");
        }
        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_absent() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "   ");
        }

        let config = ServerConfig::from_env().unwrap();
        assert!(config.openai_api_key().is_none());
        assert!(config.realtime_config().is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_tls_requires_both_paths() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TLS_CERT_PATH", "/tmp/cert.pem");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("TLS requires both"));

        unsafe {
            env::set_var("TLS_KEY_PATH", "/tmp/key.pem");
        }
        let config = ServerConfig::from_env().unwrap();
        let tls = config.tls.as_ref().unwrap();
        assert_eq!(tls.key_path, PathBuf::from("/tmp/key.pem"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

providers:
  openai_api_key: "yaml-key"

bridge:
  silence_timeout_ms: 700
  model: "gpt-4o-mini-realtime-preview"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("OPENAI_API_KEY", "env-key");
            env::set_var("PUBLIC_BASE_URL", "https://env.example.com");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.openai_api_key(), Some("yaml-key"));
        // ENV fills what YAML leaves out
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://env.example.com")
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.silence_timeout_ms, 700);
        assert_eq!(
            config.realtime_model,
            OpenAIRealtimeModel::Gpt4oMiniRealtimePreview
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = ServerConfig::default();
        config.openai_api_key = Some("sk-secret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
