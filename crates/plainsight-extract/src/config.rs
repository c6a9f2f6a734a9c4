//! Extractor configuration

use serde::{Deserialize, Serialize};

/// Configuration for document fetching and extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum document size to accept (in bytes)
    pub max_length: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent for document requests
    pub user_agent: String,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_length: 10 * 1024 * 1024,
            timeout_secs: 30,
            user_agent: format!("PlainSight/{}", env!("CARGO_PKG_VERSION")),
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

impl ExtractorConfig {
    /// Set the maximum accepted document size
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Configure redirect handling
    pub fn with_redirects(mut self, follow: bool, max: usize) -> Self {
        self.follow_redirects = follow;
        self.max_redirects = max;
        self
    }
}
