//! Error types for document fetching and extraction

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur while fetching or decoding a policy document
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Network error during fetch
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP error response
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout error
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// HTML parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// PDF decode error
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Content too large
    #[error("Content too large: {size} bytes exceeds max {max} bytes")]
    ContentTooLarge { size: usize, max: usize },
}

/// Which side of the extraction an error belongs to.
///
/// Fetch failures are network problems; decode failures mean the bytes
/// arrived but could not be turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Decode,
}

impl ExtractError {
    /// Classify this error as a fetch or a decode failure
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::Network(_)
            | ExtractError::Http { .. }
            | ExtractError::InvalidUrl(_)
            | ExtractError::Timeout(_) => FailureKind::Fetch,
            ExtractError::Parse(_) | ExtractError::Pdf(_) | ExtractError::ContentTooLarge { .. } => {
                FailureKind::Decode
            }
        }
    }

    /// Map a reqwest error, reporting timeouts with the configured duration
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ExtractError::Timeout(timeout_secs)
        } else if let Some(status) = err.status() {
            ExtractError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ExtractError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ExtractError {
    fn from(err: url::ParseError) -> Self {
        ExtractError::InvalidUrl(err.to_string())
    }
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for ExtractError {
    fn from(err: lopdf::Error) -> Self {
        ExtractError::Pdf(err.to_string())
    }
}
