//! Application configuration

use std::env;
use std::time::Duration;

use florachat_engine::AutoReplyConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Redis (transcript store)
    pub redis_url: String,

    // Auto-reply responder
    pub auto_reply_enabled: bool,
    pub auto_reply_delay_ms: u64,
    pub auto_reply_typing_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),

            // Redis
            redis_url: env::var("REDIS_URL").map_err(|_| ConfigError::Missing("REDIS_URL"))?,

            // Auto-reply responder
            auto_reply_enabled: env::var("AUTO_REPLY_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            auto_reply_delay_ms: env::var("AUTO_REPLY_DELAY_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10000),
            auto_reply_typing_ms: env::var("AUTO_REPLY_TYPING_MS")
                .unwrap_or_else(|_| "1500".to_string())
                .parse()
                .unwrap_or(1500),
        })
    }

    /// Timer delays for the hosted auto-reply engine
    pub fn auto_reply(&self) -> AutoReplyConfig {
        AutoReplyConfig {
            delayed_reply_after: Duration::from_millis(self.auto_reply_delay_ms),
            instant_reply_after: Duration::from_millis(self.auto_reply_typing_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
