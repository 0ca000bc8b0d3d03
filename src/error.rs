//! Engine errors
//!
//! Malformed numeric input never lands here: it is normalized to zero at the
//! boundary and reported as an info violation instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}
