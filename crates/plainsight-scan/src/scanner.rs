//! Policy link discovery on the active page

use crate::capability::PageAccess;
use crate::error::Result;
use crate::types::{LinkCandidate, RawAnchor, Tab};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

static POLICY_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)privacy|cookie|terms|policy|legal").expect("valid policy regex"));

/// Result of scanning a tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The tab is not a web page (browser-internal, file, ...)
    Restricted { url: String },
    /// Policy-looking links, in document order; may be empty
    Candidates(Vec<LinkCandidate>),
}

/// Whether visible link text looks like a legal policy link
pub fn is_policy_text(text: &str) -> bool {
    POLICY_TEXT.is_match(text)
}

/// Trim anchor text and keep the policy-looking links with a usable href
pub fn filter_anchors(anchors: Vec<RawAnchor>) -> Vec<LinkCandidate> {
    anchors
        .into_iter()
        .filter_map(|anchor| {
            let text = anchor.text.trim();
            if text.is_empty() || !is_policy_text(text) {
                return None;
            }
            match Url::parse(&anchor.href) {
                Ok(href) => Some(LinkCandidate {
                    text: text.to_string(),
                    href,
                }),
                Err(e) => {
                    debug!(href = %anchor.href, error = %e, "skipping anchor with unusable href");
                    None
                }
            }
        })
        .collect()
}

/// Read the tab's anchors and return the policy link candidates
pub async fn scan_tab(page: &dyn PageAccess, tab: &Tab) -> Result<ScanOutcome> {
    if !tab.is_web_reachable() {
        debug!(url = %tab.url, "tab is not a web page");
        return Ok(ScanOutcome::Restricted {
            url: tab.url.clone(),
        });
    }

    let anchors = page.list_anchors(tab.id).await?;
    let total = anchors.len();
    let candidates = filter_anchors(anchors);
    debug!(tab = %tab.id, total, candidates = candidates.len(), "scanned anchors");

    Ok(ScanOutcome::Candidates(candidates))
}
