//! Fetch error types.

use std::time::Duration;

/// Error type for fetch operations.
///
/// HTTP error statuses are not errors: a fetch that receives a 404 or 500
/// resolves with that response. Only failures to obtain a response land here.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Network unavailable")]
    Offline,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

impl From<url::ParseError> for FetchError {
    fn from(e: url::ParseError) -> Self {
        FetchError::InvalidUrl(e.to_string())
    }
}
