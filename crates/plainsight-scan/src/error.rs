//! Error types for scanning and analysis

use thiserror::Error;

/// Result type for capability calls
pub type Result<T> = std::result::Result<T, ScanError>;

/// Failures reported by the page-access and cookie-store capabilities
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No active tab")]
    NoActiveTab,

    #[error("Page access error: {0}")]
    PageAccess(String),

    #[error("Cookie store error: {0}")]
    CookieStore(String),
}

/// Failures of a single analyzer call
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Non-2xx response; carries the upstream status and body text
    #[error("Analyzer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Analyzer request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    /// 2xx response whose body is not the expected JSON
    #[error("Invalid analyzer response: {0}")]
    InvalidResponse(String),

    /// 2xx response carrying an `{"error": ...}` body
    #[error("{0}")]
    Reported(String),

    #[error("Analyzer configuration error: {0}")]
    Configuration(String),
}

impl AnalyzerError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AnalyzerError::Status { status, .. } => *status >= 500,
            AnalyzerError::Timeout(_) | AnalyzerError::Network(_) => true,
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            AnalyzerError::Timeout(timeout_secs)
        } else if err.is_decode() {
            AnalyzerError::InvalidResponse(err.to_string())
        } else {
            AnalyzerError::Network(err.to_string())
        }
    }
}
