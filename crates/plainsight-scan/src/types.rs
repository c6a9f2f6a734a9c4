//! Core data model shared by the scanner stages

use serde::{Deserialize, Serialize};
use url::Url;

/// Identifier of a browser tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// The tab being inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
}

impl Tab {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id: TabId(id),
            url: url.into(),
        }
    }

    /// Only http(s) pages can be inspected; browser-internal pages cannot
    pub fn is_web_reachable(&self) -> bool {
        Url::parse(&self.url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    /// Hostname of the tab URL (`location.hostname`)
    pub fn hostname(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// An anchor as read from the page, before filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnchor {
    pub text: String,
    pub href: String,
}

impl RawAnchor {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

/// A link whose text looks like it points at a legal policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub text: String,
    pub href: Url,
}

/// A cookie visible to page scripts through `document.cookie`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomCookie {
    pub name: String,
    pub value: String,
}

/// SameSite attribute as reported by the browser cookie store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    #[serde(rename = "strict", alias = "Strict")]
    Strict,
    #[serde(rename = "lax", alias = "Lax")]
    Lax,
    #[serde(rename = "no_restriction", alias = "None", alias = "none")]
    None,
    #[default]
    #[serde(rename = "unspecified", alias = "Unspecified")]
    Unspecified,
}

impl SameSite {
    /// Value sent to the cookie analyzer; a missing attribute is reported as "None"
    pub fn as_analyzer_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None | SameSite::Unspecified => "None",
        }
    }
}

/// A cookie from the browser cookie store.
///
/// Unlike [`DomCookie`] this includes HttpOnly and cross-origin cookies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: SameSite,
    /// Expiry as epoch seconds; `None` for session cookies
    #[serde(default)]
    pub expiration_date: Option<f64>,
}

impl BrowserCookie {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiration_date: None,
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn expires_at(mut self, epoch_secs: f64) -> Self {
        self.expiration_date = Some(epoch_secs);
        self
    }
}
