//! Error types for backend calls.

use thiserror::Error;

use seace_core::{ConfigError, SeaceError, ValidationError};

/// A failed backend call.
///
/// `Clone` so one failed in-flight fetch can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// True for failures worth retrying later: timeouts, transport errors
    /// and 5xx statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Transport(_) => true,
            FetchError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl From<SeaceError> for FetchError {
    fn from(err: SeaceError) -> Self {
        match err {
            SeaceError::Validation(e) => FetchError::Decode(e.to_string()),
            SeaceError::Config(e) => FetchError::Config(e.to_string()),
        }
    }
}

impl From<ValidationError> for FetchError {
    fn from(err: ValidationError) -> Self {
        SeaceError::from(err).into()
    }
}

impl From<ConfigError> for FetchError {
    fn from(err: ConfigError) -> Self {
        SeaceError::from(err).into()
    }
}
