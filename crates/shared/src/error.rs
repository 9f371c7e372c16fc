//! Error types for FloraChat

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl From<redis::RedisError> for ChatError {
    fn from(err: redis::RedisError) -> Self {
        ChatError::Store(err.to_string())
    }
}

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
