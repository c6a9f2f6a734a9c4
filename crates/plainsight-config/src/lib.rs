use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default base URL of the local analyzer backend
pub const DEFAULT_ANALYZER_URL: &str = "http://127.0.0.1:8000";

/// Default URL of the locally hosted dashboard
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:8501";

/// Environment variable overriding `analyzer_base_url`
pub const ENV_ANALYZER_URL: &str = "PLAINSIGHT_ANALYZER_URL";

/// Environment variable overriding `dashboard_url`
pub const ENV_DASHBOARD_URL: &str = "PLAINSIGHT_DASHBOARD_URL";

/// Errors raised while reading or writing the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Shared configuration for the scanner, the extractors and the CLI.
///
/// Loaded from `~/.plainsight/config.toml`; every field is optional in the
/// file and falls back to [`PlainsightConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlainsightConfig {
    // Paths
    pub config_dir: PathBuf,

    // Analyzer backend
    pub analyzer_base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,

    // Document fetching
    pub max_document_bytes: usize,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub max_redirects: usize,

    // Dashboard
    pub dashboard_url: String,
}

impl Default for PlainsightConfig {
    fn default() -> Self {
        let home = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".plainsight");

        Self {
            config_dir: home,

            analyzer_base_url: DEFAULT_ANALYZER_URL.to_string(),
            request_timeout_secs: 30,
            // Retries are opt-in; the analyzers are not guaranteed idempotent
            max_retries: 0,
            retry_backoff_ms: 500,

            max_document_bytes: 10 * 1024 * 1024,
            user_agent: format!(
                "PlainSight/{} (+https://github.com/plainsight/plainsight)",
                env!("CARGO_PKG_VERSION")
            ),
            follow_redirects: true,
            max_redirects: 5,

            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }
}

impl PlainsightConfig {
    /// Path of the config file inside `config_dir`
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Load config from ~/.plainsight/config.toml, or defaults when the file is missing.
    /// Environment overrides are applied last.
    pub fn load() -> Result<Self> {
        let path = Self::default().config_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to `config_dir/config.toml`
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(self.config_path(), contents)?;
        Ok(())
    }

    /// Apply `PLAINSIGHT_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(
            std::env::var(ENV_ANALYZER_URL).ok(),
            std::env::var(ENV_DASHBOARD_URL).ok(),
        )
    }

    fn apply_overrides(mut self, analyzer: Option<String>, dashboard: Option<String>) -> Self {
        if let Some(url) = analyzer.filter(|u| !u.trim().is_empty()) {
            self.analyzer_base_url = url;
        }
        if let Some(url) = dashboard.filter(|u| !u.trim().is_empty()) {
            self.dashboard_url = url;
        }
        self
    }

    /// Set the analyzer base URL
    pub fn with_analyzer_url(mut self, url: impl Into<String>) -> Self {
        self.analyzer_base_url = url.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.request_timeout_secs = timeout_secs;
        self
    }

    /// Set how many times a transient analyzer failure is retried
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the dashboard URL
    pub fn with_dashboard_url(mut self, url: impl Into<String>) -> Self {
        self.dashboard_url = url.into();
        self
    }

    /// Analyzer base URL without a trailing slash
    pub fn analyzer_url(&self) -> &str {
        self.analyzer_base_url.trim_end_matches('/')
    }
}
