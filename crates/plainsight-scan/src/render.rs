//! Display model for scan results
//!
//! Pure functions only. Every optional analyzer field gets a fixed fallback
//! so a partial response still renders completely.

use crate::analyzer::{AnalyzerResult, CookieReport, PolicySummary};
use crate::pipeline::{ScanFailure, ScanReport, ScanState};
use serde::Serialize;
use std::fmt;

pub const UNKNOWN_RISK: &str = "Unknown";
pub const NO_SUMMARY: &str = "No summary available";
pub const NONE_REPORTED: &str = "None reported";

/// One analyzer section: either displayable content or the error it returned
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyView {
    pub summary: String,
    pub risk_level: String,
    pub risk_score: String,
    pub takeaways: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CookieView {
    pub summary: String,
    pub risk_level: String,
    pub flags: Vec<String>,
}

/// Technical details shown under both sections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalView {
    pub policy_url: String,
    pub site_domain: String,
    pub cmp_detected: String,
    pub consent_apis: String,
    pub consent_cookies: String,
    pub cookie_count: usize,
}

/// Everything the presentation layer needs for a finished scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub policy: Section<PolicyView>,
    pub cookies: Section<CookieView>,
    pub technical: TechnicalView,
}

fn or_fallback(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

fn list_or_none(items: &[String]) -> Vec<String> {
    let items: Vec<String> = items
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        vec![NONE_REPORTED.to_string()]
    } else {
        items
    }
}

fn joined_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        NONE_REPORTED.to_string()
    } else {
        items.join(", ")
    }
}

fn section<T, V>(result: &AnalyzerResult<T>, view: impl FnOnce(&T) -> V) -> Section<V> {
    match result {
        AnalyzerResult::Success(value) => Section::Ready(view(value)),
        AnalyzerResult::Failed { error } => Section::Error {
            message: error.clone(),
        },
    }
}

impl PolicyView {
    fn build(summary: &PolicySummary) -> Self {
        Self {
            summary: or_fallback(summary.summary_simple.as_deref(), NO_SUMMARY),
            risk_level: or_fallback(summary.risk_level.as_deref(), UNKNOWN_RISK),
            risk_score: summary
                .policy_risk_score
                .map(|s| format!("{:.0}", s))
                .unwrap_or_else(|| UNKNOWN_RISK.to_string()),
            takeaways: list_or_none(&summary.key_takeaways),
        }
    }
}

impl CookieView {
    fn build(report: &CookieReport) -> Self {
        Self {
            summary: or_fallback(report.summary.as_deref(), NO_SUMMARY),
            risk_level: or_fallback(report.risk_level.as_deref(), UNKNOWN_RISK),
            flags: list_or_none(&report.flags),
        }
    }
}

impl ResultView {
    pub fn build(report: &ScanReport) -> Self {
        let cmp = &report.evidence.cmp;
        let consent_cookies: Vec<&str> = cmp.consent_cookies.iter().map(String::as_str).collect();

        Self {
            policy: section(&report.results.policy, PolicyView::build),
            cookies: section(&report.results.cookies, CookieView::build),
            technical: TechnicalView {
                policy_url: report.policy_link.href.to_string(),
                site_domain: report.cookie_payload.site_domain.clone(),
                cmp_detected: report.cookie_payload.cmp_detected.clone(),
                consent_apis: joined_or_none(&cmp.detected_apis()),
                consent_cookies: joined_or_none(&consent_cookies),
                cookie_count: report.cookie_payload.cookies.len(),
            },
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    for item in items {
        writeln!(f, "  - {}", item)?;
    }
    Ok(())
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Policy")?;
        match &self.policy {
            Section::Ready(p) => {
                writeln!(f, "  Risk: {} (score {})", p.risk_level, p.risk_score)?;
                writeln!(f, "  {}", p.summary)?;
                writeln!(f, "  Key takeaways:")?;
                write_list(f, &p.takeaways)?;
            }
            Section::Error { message } => writeln!(f, "  Error: {}", message)?,
        }

        writeln!(f)?;
        writeln!(f, "Cookies")?;
        match &self.cookies {
            Section::Ready(c) => {
                writeln!(f, "  Risk: {}", c.risk_level)?;
                writeln!(f, "  {}", c.summary)?;
                writeln!(f, "  Flags:")?;
                write_list(f, &c.flags)?;
            }
            Section::Error { message } => writeln!(f, "  Error: {}", message)?,
        }

        let t = &self.technical;
        writeln!(f)?;
        writeln!(f, "Technical details")?;
        writeln!(f, "  Policy URL: {}", t.policy_url)?;
        writeln!(f, "  Site: {}", t.site_domain)?;
        writeln!(f, "  CMP: {}", t.cmp_detected)?;
        writeln!(f, "  Consent APIs: {}", t.consent_apis)?;
        writeln!(f, "  Consent cookies: {}", t.consent_cookies)?;
        write!(f, "  Browser cookies: {}", t.cookie_count)
    }
}

/// Human-readable status line or result block for any pipeline state
pub fn render_state(state: &ScanState) -> String {
    match state {
        ScanState::Idle => "Ready to scan".to_string(),
        ScanState::Scanning => "Scanning page for policy links...".to_string(),
        ScanState::Selecting { candidates } => {
            format!("Found {} candidate link(s), selecting...", candidates)
        }
        ScanState::CollectingEvidence { policy_url } => {
            format!("Collecting cookie evidence for {}", policy_url)
        }
        ScanState::Extracting { policy_url, kind } => {
            format!("Extracting {} policy text from {}", kind, policy_url)
        }
        ScanState::Analyzing { .. } => "Analyzing policy and cookies...".to_string(),
        ScanState::Rendered { report } => ResultView::build(report).to_string(),
        ScanState::Failed { failure } => render_failure(failure),
    }
}

fn render_failure(failure: &ScanFailure) -> String {
    match failure {
        ScanFailure::Restricted { url } => format!("This page cannot be scanned: {}", url),
        ScanFailure::NoCandidate => "No policy link found on this page".to_string(),
        ScanFailure::PageAccess { message } => format!("Could not read the page: {}", message),
        ScanFailure::DocumentFetch { url, message } => {
            format!("Could not download the policy at {}: {}", url, message)
        }
        ScanFailure::DocumentDecode { url, message } => {
            format!("Could not read the policy document at {}: {}", url, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisResults;
    use crate::cmp::CmpInfo;
    use crate::evidence::Evidence;
    use crate::payload::{build_cookie_payload, build_policy_payload};
    use crate::types::LinkCandidate;
    use chrono::Utc;
    use plainsight_extract::{DocumentKind, ExtractResult};
    use url::Url;

    fn report(results: AnalysisResults) -> ScanReport {
        let url = Url::parse("https://www.example.com/privacy").unwrap();
        let doc = ExtractResult::new("text".into(), url.as_str(), DocumentKind::Html);
        let now = Utc::now();
        ScanReport {
            policy_link: LinkCandidate {
                text: "Privacy".into(),
                href: url.clone(),
            },
            document_kind: DocumentKind::Html,
            evidence: Evidence::default(),
            policy_payload: build_policy_payload(&url, &doc, now),
            cookie_payload: build_cookie_payload(&url, &[], &CmpInfo::default(), now),
            results,
        }
    }

    #[test]
    fn test_fallbacks_for_empty_responses() {
        let view = ResultView::build(&report(AnalysisResults {
            policy: AnalyzerResult::Success(PolicySummary::default()),
            cookies: AnalyzerResult::Success(CookieReport::default()),
        }));

        let Section::Ready(policy) = &view.policy else {
            panic!("policy section should be ready");
        };
        assert_eq!(policy.summary, NO_SUMMARY);
        assert_eq!(policy.risk_level, UNKNOWN_RISK);
        assert_eq!(policy.risk_score, UNKNOWN_RISK);
        assert_eq!(policy.takeaways, vec![NONE_REPORTED]);

        let Section::Ready(cookies) = &view.cookies else {
            panic!("cookie section should be ready");
        };
        assert_eq!(cookies.flags, vec![NONE_REPORTED]);
        assert_eq!(view.technical.cmp_detected, "unknown");
        assert_eq!(view.technical.site_domain, "example.com");
        assert_eq!(view.technical.consent_apis, NONE_REPORTED);
    }

    #[test]
    fn test_partial_failure_renders_both_sections() {
        let view = ResultView::build(&report(AnalysisResults {
            policy: AnalyzerResult::Success(PolicySummary {
                summary_simple: Some("Shares data with partners.".into()),
                risk_level: Some("high".into()),
                policy_risk_score: Some(71.6),
                ..Default::default()
            }),
            cookies: AnalyzerResult::Failed {
                error: "Analyzer returned HTTP 500: oops".into(),
            },
        }));

        let text = view.to_string();
        assert!(text.contains("Risk: high (score 72)"));
        assert!(text.contains("Shares data with partners."));
        assert!(text.contains("Error: Analyzer returned HTTP 500: oops"));
    }

    #[test]
    fn test_render_terminal_failures() {
        assert_eq!(
            render_state(&ScanState::Failed {
                failure: ScanFailure::NoCandidate
            }),
            "No policy link found on this page"
        );
        let text = render_state(&ScanState::Failed {
            failure: ScanFailure::DocumentFetch {
                url: "https://x.com/p".into(),
                message: "HTTP error 404: Not Found".into(),
            },
        });
        assert!(text.starts_with("Could not download"));
    }
}
