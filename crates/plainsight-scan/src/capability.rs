//! Capabilities the scanner needs from its host environment.
//!
//! In a browser extension these are injected scripts and the cookies API;
//! the CLI implements them over a one-shot HTTP snapshot of the page.
//! Document fetching lives in `plainsight_extract::DocumentFetcher`.

use crate::error::Result;
use crate::types::{BrowserCookie, RawAnchor, Tab, TabId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Read-only introspection of the live page in the user's session
#[async_trait::async_trait]
pub trait PageAccess: Send + Sync {
    /// The tab the user is looking at
    async fn active_tab(&self) -> Result<Tab>;

    /// Every anchor on the page with its visible text and resolved href
    async fn list_anchors(&self, tab: TabId) -> Result<Vec<RawAnchor>>;

    /// The raw `document.cookie` string
    async fn read_dom_cookie_string(&self, tab: TabId) -> Result<String>;

    /// Report the type of each named `window` global
    async fn inspect_globals(&self, tab: TabId, names: &[String]) -> Result<PageGlobals>;
}

/// Browser-level cookie store
#[async_trait::async_trait]
pub trait CookieStore: Send + Sync {
    /// All cookies the browser would send to `url`
    async fn get_all_cookies(&self, url: &Url) -> Result<Vec<BrowserCookie>>;
}

/// What a `window` global evaluated to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalValue {
    #[default]
    Undefined,
    Falsy,
    Truthy,
    Function,
}

impl GlobalValue {
    pub fn is_function(self) -> bool {
        self == GlobalValue::Function
    }

    pub fn is_truthy(self) -> bool {
        matches!(self, GlobalValue::Truthy | GlobalValue::Function)
    }
}

/// Snapshot of selected page globals; names that were not reported are undefined
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageGlobals(HashMap<String, GlobalValue>);

impl PageGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: GlobalValue) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: GlobalValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> GlobalValue {
        self.0.get(name).copied().unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<(S, GlobalValue)> for PageGlobals {
    fn from_iter<I: IntoIterator<Item = (S, GlobalValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
