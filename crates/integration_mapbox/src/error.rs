//! Mapbox client error types

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the Mapbox API
#[derive(Debug, Error)]
pub enum MapboxError {
    /// The request could not be serialized; no network I/O was attempted
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The underlying network call failed (DNS, connect, TLS, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting for a response
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// The service answered with a status outside 200-299
    #[error("Unexpected HTTP status: {status}")]
    Status {
        /// Status returned by the service
        status: StatusCode,
    },

    /// The response body is not valid JSON or has an unexpected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Client configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MapboxError {
    /// HTTP status carried by a [`MapboxError::Status`] error
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the service reported that nothing matched (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(StatusCode::NOT_FOUND)
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Transport(err.to_string())
        }
    }
}
