//! Analyzer request payloads
//!
//! Pure transformations from collected evidence and extracted text into the
//! JSON bodies the two analyzer services accept. No I/O happens here.

use crate::cmp::CmpInfo;
use crate::types::BrowserCookie;
use chrono::{DateTime, Utc};
use plainsight_extract::ExtractResult;
use serde::{Deserialize, Serialize};
use url::Url;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Value of `cmp_detected` when no provider was recognised
pub const UNKNOWN_CMP: &str = "unknown";

/// Body of `POST /policy/analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyPayload {
    pub url: String,
    pub raw_text: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A browser cookie in the cookie analyzer's schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCookie {
    pub name: String,
    pub domain: String,
    pub expiry_days: u32,
    pub secure: bool,
    #[serde(rename = "sameSite")]
    pub same_site: String,
}

/// A consent category as shown in a cookie banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentCategory {
    pub label: String,
    pub description: String,
    pub prechecked: bool,
}

impl ConsentCategory {
    fn new(label: &str, description: &str, prechecked: bool) -> Self {
        Self {
            label: label.to_string(),
            description: description.to_string(),
            prechecked,
        }
    }
}

/// Evidence about the consent banner's interaction design
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentUiEvidence {
    pub accept_clicks: u32,
    pub reject_clicks: u32,
    pub manage_preferences_visible: bool,
    pub consent_required_to_proceed: bool,
    pub categories: Vec<ConsentCategory>,
}

impl ConsentUiEvidence {
    /// Fixed v1 approximation of a typical banner.
    ///
    /// Nothing here is observed on the page yet: banner interaction is not
    /// detected, so these values only keep the analyzer contract stable.
    pub fn placeholder() -> Self {
        Self {
            accept_clicks: 1,
            reject_clicks: 2,
            manage_preferences_visible: true,
            consent_required_to_proceed: false,
            categories: vec![
                ConsentCategory::new("Necessary", "Required for the site to function", true),
                ConsentCategory::new("Analytics", "Usage measurement", false),
                ConsentCategory::new("Marketing", "Advertising and cross-site tracking", false),
            ],
        }
    }
}

/// Body of `POST /cookies/analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieAnalyzerPayload {
    pub site_domain: String,
    pub cookies: Vec<NormalizedCookie>,
    pub consent_ui: ConsentUiEvidence,
    pub cmp_detected: String,
}

/// Build the summarizer payload from extracted policy text
pub fn build_policy_payload(
    url: &Url,
    document: &ExtractResult,
    captured_at: DateTime<Utc>,
) -> PolicyPayload {
    PolicyPayload {
        url: url.to_string(),
        raw_text: document.text.clone(),
        captured_at,
        title: document.title.clone(),
    }
}

/// Build the cookie analyzer payload from browser cookies and the CMP fingerprint
pub fn build_cookie_payload(
    url: &Url,
    cookies: &[BrowserCookie],
    cmp: &CmpInfo,
    now: DateTime<Utc>,
) -> CookieAnalyzerPayload {
    let now_secs = now.timestamp_millis() as f64 / 1000.0;

    CookieAnalyzerPayload {
        site_domain: site_domain(url),
        cookies: cookies
            .iter()
            .map(|c| normalize_cookie(c, now_secs))
            .collect(),
        consent_ui: ConsentUiEvidence::placeholder(),
        cmp_detected: cmp_detected(cmp),
    }
}

fn normalize_cookie(cookie: &BrowserCookie, now_secs: f64) -> NormalizedCookie {
    NormalizedCookie {
        name: cookie.name.clone(),
        domain: cookie.domain.clone(),
        expiry_days: expiry_days(cookie.expiration_date, now_secs),
        secure: cookie.secure,
        same_site: cookie.same_site.as_analyzer_str().to_string(),
    }
}

/// Whole days until expiry, rounded; session and expired cookies are 0
pub fn expiry_days(expiration_date: Option<f64>, now_secs: f64) -> u32 {
    let Some(expires) = expiration_date else {
        return 0;
    };
    let days = ((expires - now_secs) / SECONDS_PER_DAY).round();
    // NaN fails the comparison too
    if days > 0.0 {
        days as u32
    } else {
        0
    }
}

/// Comma-joined names of detected providers, or `"unknown"`
pub fn cmp_detected(cmp: &CmpInfo) -> String {
    let providers = cmp.detected_providers();
    if providers.is_empty() {
        UNKNOWN_CMP.to_string()
    } else {
        providers.join(",")
    }
}

/// Registrable-looking site domain: the URL host without a leading `www.`
pub fn site_domain(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
