//! Consent-management-platform fingerprinting
//!
//! The probe is a registry of global checks. Consent APIs must be callable
//! functions; vendor providers only need a truthy global. Registering a new
//! provider is a matter of adding a [`GlobalCheck`], nothing downstream
//! changes.

use crate::capability::PageGlobals;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static CONSENT_COOKIE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)consent|optanon|euconsent").expect("valid consent cookie regex"));

/// How a global must evaluate for a check to pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Function,
    Truthy,
}

/// One named check against a `window` global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalCheck {
    /// Key reported in [`CmpInfo`]
    pub name: String,
    /// Global inspected on the page
    pub global: String,
    pub kind: CheckKind,
}

impl GlobalCheck {
    pub fn function(name: impl Into<String>, global: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global: global.into(),
            kind: CheckKind::Function,
        }
    }

    pub fn truthy(name: impl Into<String>, global: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global: global.into(),
            kind: CheckKind::Truthy,
        }
    }

    fn passes(&self, globals: &PageGlobals) -> bool {
        let value = globals.get(&self.global);
        match self.kind {
            CheckKind::Function => value.is_function(),
            CheckKind::Truthy => value.is_truthy(),
        }
    }
}

/// IAB TCF, US Privacy and GPP consent APIs
pub fn standard_consent_apis() -> Vec<GlobalCheck> {
    vec![
        GlobalCheck::function("tcf", "__tcfapi"),
        GlobalCheck::function("usp", "__uspapi"),
        GlobalCheck::function("gpp", "__gpp"),
    ]
}

/// Vendor CMPs recognised by their loader globals
pub fn known_providers() -> Vec<GlobalCheck> {
    vec![
        GlobalCheck::truthy("onetrust", "OneTrust"),
        GlobalCheck::truthy("cookiebot", "Cookiebot"),
        GlobalCheck::truthy("didomi", "didomi"),
        GlobalCheck::truthy("quantcast", "__cmp"),
    ]
}

/// Point-in-time CMP fingerprint of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmpInfo {
    /// Standard consent API name → present as a function
    pub detected: BTreeMap<String, bool>,
    /// Provider name → loader global present
    pub providers: BTreeMap<String, bool>,
    /// Names of cookies that look like consent state
    pub consent_cookies: Vec<String>,
    /// Page hostname
    pub page: String,
}

impl CmpInfo {
    /// Names of providers flagged true, in name order
    pub fn detected_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of consent APIs found, in name order
    pub fn detected_apis(&self) -> Vec<&str> {
        self.detected
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// The CMP fingerprint probe
#[derive(Debug, Clone)]
pub struct CmpProbe {
    apis: Vec<GlobalCheck>,
    providers: Vec<GlobalCheck>,
}

impl Default for CmpProbe {
    fn default() -> Self {
        Self {
            apis: standard_consent_apis(),
            providers: known_providers(),
        }
    }
}

impl CmpProbe {
    /// Register an additional provider check
    pub fn with_provider(mut self, check: GlobalCheck) -> Self {
        self.providers.push(check);
        self
    }

    /// Globals the page capability has to report on
    pub fn globals(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .apis
            .iter()
            .chain(self.providers.iter())
            .map(|c| c.global.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Evaluate the registry against a globals snapshot and `document.cookie`
    pub fn evaluate(&self, globals: &PageGlobals, cookie_string: &str, hostname: &str) -> CmpInfo {
        let detected = self
            .apis
            .iter()
            .map(|c| (c.name.clone(), c.passes(globals)))
            .collect();
        let providers = self
            .providers
            .iter()
            .map(|c| (c.name.clone(), c.passes(globals)))
            .collect();

        CmpInfo {
            detected,
            providers,
            consent_cookies: consent_cookie_names(cookie_string),
            page: hostname.to_string(),
        }
    }
}

/// Names of `document.cookie` entries whose name looks like consent state
pub fn consent_cookie_names(cookie_string: &str) -> Vec<String> {
    cookie_string
        .split("; ")
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.split('=').next().unwrap_or_default())
        .filter(|name| CONSENT_COOKIE.is_match(name))
        .map(str::to_string)
        .collect()
}
