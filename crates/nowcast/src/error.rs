//! Fetch error types.

use std::time::Duration;

use thiserror::Error;

/// A single fetch attempt failed.
///
/// Never crosses the crate boundary: the series builder turns it into a
/// degraded step, the provider chain into "try the next endpoint".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// The provider has no product for this offset (e.g. not yet published).
    #[error("no product published for offset {offset_minutes} min")]
    NotPublished { offset_minutes: i64 },

    #[error("I/O error: {0}")]
    Io(String),

    /// The endpoint template could not be rendered for this step.
    #[error("invalid endpoint template: {0}")]
    InvalidTemplate(String),
}

impl FetchError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report the configured duration
            FetchError::Timeout(Duration::ZERO)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

/// Result type for provider operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
