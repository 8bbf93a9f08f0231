//! Client error types

use thiserror::Error;

/// Errors that can occur when talking to the cardio backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Backend unavailable at {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status; `message` is already human-readable
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a transport error, separating timeouts and refused connections
    pub(crate) fn from_transport(error: reqwest::Error, base_url: &str) -> Self {
        if error.is_timeout() {
            ClientError::Timeout
        } else if error.is_connect() {
            ClientError::Unavailable(base_url.to_string())
        } else {
            ClientError::Request(error)
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
