//! One-shot HTTP snapshot of a page
//!
//! Stands in for a live browser tab: the page is fetched once, anchors and
//! scripts are read from the markup, and cookies come from the `Set-Cookie`
//! headers of the response.

use chrono::{DateTime, Utc};
use plainsight_config::PlainsightConfig;
use plainsight_scan::{
    BrowserCookie, CookieStore, GlobalValue, PageAccess, PageGlobals, RawAnchor, SameSite,
    ScanError, Tab, TabId,
};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use url::Url;

/// Script hosts of known consent vendors and the global their loader installs
const VENDOR_LOADERS: &[(&str, &str)] = &[
    ("cdn.cookielaw.org", "OneTrust"),
    ("optanon.blob.core.windows.net", "OneTrust"),
    ("consent.cookiebot.com", "Cookiebot"),
    ("sdk.privacy-center.org", "didomi"),
    ("cmp.quantcast.com", "__cmp"),
    ("quantcast.mgr.consensu.org", "__cmp"),
];

#[derive(Debug, Clone, PartialEq)]
struct SnapshotCookie {
    cookie: BrowserCookie,
    value: String,
}

/// Page state captured from a single GET
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    tab: Tab,
    anchors: Vec<RawAnchor>,
    scripts: Vec<String>,
    cookies: Vec<SnapshotCookie>,
    /// Why the page could not be loaded; surfaces as a page-access failure
    failure: Option<String>,
}

impl PageSnapshot {
    /// Fetch `url` and capture its anchors, scripts and cookies.
    ///
    /// Non-web URLs are not fetched; the snapshot is empty and the scan
    /// reports them as restricted. A page that cannot be loaded yields a
    /// snapshot whose `active_tab` fails.
    pub async fn capture(url: &str, config: &PlainsightConfig) -> Self {
        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            _ => return Self::empty(url),
        };

        match Self::fetch(parsed, config).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(%url, error = %e, "failed to load page");
                Self {
                    failure: Some(format!("failed to load {}: {}", url, e)),
                    ..Self::empty(url)
                }
            }
        }
    }

    async fn fetch(url: Url, config: &PlainsightConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        let response = client.get(url).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let host = final_url.host_str().unwrap_or_default().to_string();

        let now = Utc::now();
        let cookies: Vec<SnapshotCookie> = response
            .cookies()
            .map(|c| {
                let mut cookie = BrowserCookie::new(c.name(), c.domain().unwrap_or(host.as_str()))
                    .secure(c.secure())
                    .http_only(c.http_only())
                    .same_site(same_site(c.same_site_strict(), c.same_site_lax()));
                cookie.expiration_date = expiration(c.max_age(), c.expires(), now);
                SnapshotCookie {
                    cookie,
                    value: c.value().to_string(),
                }
            })
            .collect();

        let html = response.text().await?;
        let (anchors, scripts) = parse_page(&html, &final_url);
        info!(
            url = %final_url,
            anchors = anchors.len(),
            scripts = scripts.len(),
            cookies = cookies.len(),
            "captured page snapshot"
        );

        Ok(Self {
            tab: Tab::new(1, final_url.as_str()),
            anchors,
            scripts,
            cookies,
            failure: None,
        })
    }

    fn empty(url: &str) -> Self {
        Self {
            tab: Tab::new(1, url),
            anchors: Vec::new(),
            scripts: Vec::new(),
            cookies: Vec::new(),
            failure: None,
        }
    }

    /// `document.cookie` as the page would see it: no HttpOnly cookies
    fn dom_cookie_string(&self) -> String {
        self.cookies
            .iter()
            .filter(|c| !c.cookie.http_only)
            .map(|c| format!("{}={}", c.cookie.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn same_site(strict: bool, lax: bool) -> SameSite {
    if strict {
        SameSite::Strict
    } else if lax {
        SameSite::Lax
    } else {
        SameSite::Unspecified
    }
}

/// Epoch seconds of expiry; `Max-Age` wins over `Expires`
fn expiration(
    max_age: Option<Duration>,
    expires: Option<SystemTime>,
    now: DateTime<Utc>,
) -> Option<f64> {
    let now_secs = now.timestamp() as f64;
    if let Some(age) = max_age {
        return Some(now_secs + age.as_secs_f64());
    }
    expires.map(|at| DateTime::<Utc>::from(at).timestamp() as f64)
}

/// Anchors with hrefs resolved against `base`, plus script sources and inline bodies
fn parse_page(html: &str, base: &Url) -> (Vec<RawAnchor>, Vec<String>) {
    let document = Html::parse_document(html);
    let (Ok(anchor_sel), Ok(script_sel)) = (Selector::parse("a[href]"), Selector::parse("script"))
    else {
        return (Vec::new(), Vec::new());
    };

    let anchors = document
        .select(&anchor_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let resolved = base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string());
            let text = a
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            Some(RawAnchor::new(text, resolved))
        })
        .collect();

    let scripts = document
        .select(&script_sel)
        .map(|s| match s.value().attr("src") {
            Some(src) => src.to_string(),
            None => s.text().collect::<String>(),
        })
        .filter(|s| !s.trim().is_empty())
        .collect();

    (anchors, scripts)
}

/// Approximate `window` globals from script text.
///
/// A global counts as present when a script mentions it or loads from a
/// vendor host known to install it. Presence is reported as a function so
/// both API and provider checks pass.
fn detect_globals(scripts: &[String], names: &[String]) -> PageGlobals {
    names
        .iter()
        .map(|name| {
            let mentioned = scripts.iter().any(|s| s.contains(name.as_str()));
            let loaded = VENDOR_LOADERS.iter().any(|(host, global)| {
                *global == name.as_str() && scripts.iter().any(|s| s.contains(*host))
            });
            let value = if mentioned || loaded {
                GlobalValue::Function
            } else {
                GlobalValue::Undefined
            };
            (name.clone(), value)
        })
        .collect()
}

/// RFC 6265 domain match with an optional leading dot
fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn check_tab(snapshot: &PageSnapshot, tab: TabId) -> plainsight_scan::Result<()> {
    if snapshot.failure.is_none() && tab == snapshot.tab.id {
        Ok(())
    } else {
        Err(ScanError::NoActiveTab)
    }
}

#[async_trait::async_trait]
impl PageAccess for PageSnapshot {
    async fn active_tab(&self) -> plainsight_scan::Result<Tab> {
        match &self.failure {
            Some(message) => Err(ScanError::PageAccess(message.clone())),
            None => Ok(self.tab.clone()),
        }
    }

    async fn list_anchors(&self, tab: TabId) -> plainsight_scan::Result<Vec<RawAnchor>> {
        check_tab(self, tab)?;
        Ok(self.anchors.clone())
    }

    async fn read_dom_cookie_string(&self, tab: TabId) -> plainsight_scan::Result<String> {
        check_tab(self, tab)?;
        Ok(self.dom_cookie_string())
    }

    async fn inspect_globals(
        &self,
        tab: TabId,
        names: &[String],
    ) -> plainsight_scan::Result<PageGlobals> {
        check_tab(self, tab)?;
        Ok(detect_globals(&self.scripts, names))
    }
}

#[async_trait::async_trait]
impl CookieStore for PageSnapshot {
    async fn get_all_cookies(&self, url: &Url) -> plainsight_scan::Result<Vec<BrowserCookie>> {
        let host = url.host_str().unwrap_or_default();
        let cookies: Vec<BrowserCookie> = self
            .cookies
            .iter()
            .filter(|c| domain_matches(host, &c.cookie.domain))
            .map(|c| c.cookie.clone())
            .collect();
        debug!(%url, count = cookies.len(), "cookies in scope");
        Ok(cookies)
    }
}
