//! Cookie and consent evidence collection
//!
//! DOM cookies, browser-store cookies and the CMP fingerprint are gathered
//! concurrently from one tab snapshot. A failing source degrades to its
//! empty value; it never aborts the other two.

use crate::capability::{CookieStore, PageAccess};
use crate::cmp::{CmpInfo, CmpProbe};
use crate::types::{BrowserCookie, DomCookie, Tab};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Everything observed about the page's tracking state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub dom_cookies: Vec<DomCookie>,
    pub browser_cookies: Vec<BrowserCookie>,
    pub cmp: CmpInfo,
}

/// Parse a `document.cookie` string into name/value pairs
pub fn parse_dom_cookies(cookie_string: &str) -> Vec<DomCookie> {
    cookie_string
        .split("; ")
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => DomCookie {
                name: name.to_string(),
                value: value.to_string(),
            },
            None => DomCookie {
                name: segment.to_string(),
                value: String::new(),
            },
        })
        .collect()
}

/// Gathers the three evidence sources for a tab
pub struct EvidenceCollector {
    page: Arc<dyn PageAccess>,
    cookies: Arc<dyn CookieStore>,
    probe: CmpProbe,
}

impl EvidenceCollector {
    pub fn new(page: Arc<dyn PageAccess>, cookies: Arc<dyn CookieStore>) -> Self {
        Self {
            page,
            cookies,
            probe: CmpProbe::default(),
        }
    }

    /// Use a custom CMP probe registry
    pub fn with_probe(mut self, probe: CmpProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Collect all evidence for `tab`, scoping browser cookies to `policy_url`.
    ///
    /// `document.cookie` is read once; the DOM cookie list and the CMP
    /// fingerprint are both derived from that one string.
    pub async fn collect(&self, tab: &Tab, policy_url: &Url) -> Evidence {
        let names = self.probe.globals();
        let (cookie_string, browser_cookies, globals) = tokio::join!(
            self.page.read_dom_cookie_string(tab.id),
            self.browser_cookies(policy_url),
            self.page.inspect_globals(tab.id, &names),
        );

        let cookie_string = cookie_string.unwrap_or_else(|e| {
            warn!(tab = %tab.id, error = %e, "DOM cookies unavailable, using none");
            String::new()
        });
        let dom_cookies = parse_dom_cookies(&cookie_string);
        let cmp = match globals {
            Ok(globals) => {
                let hostname = tab.hostname().unwrap_or_default();
                self.probe.evaluate(&globals, &cookie_string, &hostname)
            }
            Err(e) => {
                warn!(tab = %tab.id, error = %e, "CMP probe failed, using empty fingerprint");
                CmpInfo::default()
            }
        };

        debug!(
            tab = %tab.id,
            dom = dom_cookies.len(),
            browser = browser_cookies.len(),
            providers = ?cmp.detected_providers(),
            "collected evidence"
        );

        Evidence {
            dom_cookies,
            browser_cookies,
            cmp,
        }
    }

    async fn browser_cookies(&self, policy_url: &Url) -> Vec<BrowserCookie> {
        match self.cookies.get_all_cookies(policy_url).await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(url = %policy_url, error = %e, "browser cookies unavailable, using none");
                Vec::new()
            }
        }
    }
}
