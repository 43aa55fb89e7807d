//! Client error types.

use clipper_models::ValidationError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Status line text for a dropped progress connection.
pub const STREAM_INTERRUPTED: &str = "Error: Connection to server was interrupted";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    RateLimited(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("{0}")]
    Protocol(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => e.to_string(),
            ClientError::Timeout(_) => {
                "Request timed out. The server may be busy, please try again.".to_string()
            }
            ClientError::RateLimited(message) => message.clone(),
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Protocol(message) => message.clone(),
            ClientError::Stream(_) => STREAM_INTERRUPTED.to_string(),
            ClientError::Network(e) => format!("Network error: {}", e),
            ClientError::Io(e) => format!("Could not save file: {}", e),
            ClientError::Config(message) => message.clone(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited(_))
    }
}
