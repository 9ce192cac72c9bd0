//! Shared application state.

use std::sync::Arc;

use tracing::warn;

use crate::config::ServerConfig;
use crate::core::bridge::{BridgeError, BridgeFactory};
use crate::core::speech::SpeechClient;

/// State shared by every handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Builds one voice bridge per accepted media stream
    pub bridges: BridgeFactory,
    /// `None` without an OpenAI credential
    pub speech: Option<SpeechClient>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// A missing credential is not an error here: health and webhook routes
    /// keep working and call handling fails per connection.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, BridgeError> {
        let bridges = BridgeFactory::openai(config.bridge_config(), config.realtime_config())?;
        if !bridges.has_credential() {
            warn!("OPENAI_API_KEY is not set; media streams will be refused");
        }

        let speech = config
            .openai_api_key()
            .map(|key| SpeechClient::new(reqwest::Client::new(), key));

        Ok(Arc::new(Self {
            config,
            bridges,
            speech,
        }))
    }
}
