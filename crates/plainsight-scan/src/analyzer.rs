//! HTTP client for the policy summarizer and the cookie analyzer

use crate::error::AnalyzerError;
use crate::payload::{CookieAnalyzerPayload, PolicyPayload};
use plainsight_config::PlainsightConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Summarizer endpoint path
pub const POLICY_ENDPOINT: &str = "/policy/analyze";

/// Cookie analyzer endpoint path
pub const COOKIES_ENDPOINT: &str = "/cookies/analyze";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of the policy summarizer; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    #[serde(default)]
    pub summary_simple: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_takeaways: Vec<String>,
    #[serde(default)]
    pub policy_risk_score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    /// Fields this client does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of the cookie analyzer; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieReport {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facts: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of one analyzer call as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzerResult<T> {
    Failed { error: String },
    Success(T),
}

impl<T> AnalyzerResult<T> {
    pub fn success(&self) -> Option<&T> {
        match self {
            AnalyzerResult::Success(value) => Some(value),
            AnalyzerResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalyzerResult::Failed { error } => Some(error),
            AnalyzerResult::Success(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalyzerResult::Failed { .. })
    }
}

impl<T> From<Result<T, AnalyzerError>> for AnalyzerResult<T> {
    fn from(result: Result<T, AnalyzerError>) -> Self {
        match result {
            Ok(value) => AnalyzerResult::Success(value),
            Err(e) => AnalyzerResult::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Results of both analyzer calls; each section is independent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub policy: AnalyzerResult<PolicySummary>,
    pub cookies: AnalyzerResult<CookieReport>,
}

/// Analyzer client configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub timeout_secs: u64,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&PlainsightConfig::default())
    }
}

impl From<&PlainsightConfig> for AnalyzerConfig {
    fn from(config: &PlainsightConfig) -> Self {
        Self {
            base_url: config.analyzer_url().to_string(),
            timeout_secs: config.request_timeout_secs,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }
}

/// Client for both analyzer services
#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    config: AnalyzerConfig,
    client: Client,
}

impl AnalyzerClient {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Send policy text to the summarizer
    pub async fn summarize_policy(
        &self,
        payload: &PolicyPayload,
    ) -> Result<PolicySummary, AnalyzerError> {
        self.post_json(POLICY_ENDPOINT, payload).await
    }

    /// Send cookie evidence to the cookie analyzer
    pub async fn analyze_cookies(
        &self,
        payload: &CookieAnalyzerPayload,
    ) -> Result<CookieReport, AnalyzerError> {
        self.post_json(COOKIES_ENDPOINT, payload).await
    }

    /// Run both analyzers concurrently; a failure only affects its own section
    pub async fn analyze(
        &self,
        policy: &PolicyPayload,
        cookies: &CookieAnalyzerPayload,
    ) -> AnalysisResults {
        let (policy, cookies) =
            tokio::join!(self.summarize_policy(policy), self.analyze_cookies(cookies));

        if let Err(e) = &policy {
            warn!(error = %e, "policy summarizer failed");
        }
        if let Err(e) = &cookies {
            warn!(error = %e, "cookie analyzer failed");
        }

        AnalysisResults {
            policy: policy.into(),
            cookies: cookies.into(),
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AnalyzerError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt = 0;
        loop {
            match self.post_once(&url, body).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = backoff_ms(self.config.retry_backoff_ms, attempt);
                    warn!(%url, attempt, backoff_ms = backoff, error = %e, "retrying analyzer call");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                result => return result,
            }
        }
    }

    async fn post_once<B, T>(&self, url: &str, body: &B) -> Result<T, AnalyzerError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "calling analyzer");
        let timeout = self.config.timeout_secs;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AnalyzerError::from_reqwest(e, timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AnalyzerError::from_reqwest(e, timeout))?;

        if !status.is_success() {
            return Err(AnalyzerError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;
        if let Some(error) = reported_error(&value) {
            return Err(AnalyzerError::Reported(error));
        }

        info!(%url, status = status.as_u16(), "analyzer responded");
        serde_json::from_value(value).map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))
    }
}

/// The `error` member of a 2xx body, if the service reported one
fn reported_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Linear backoff, clamped instead of overflowing on large configured values
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(u64::from(attempt))
}
