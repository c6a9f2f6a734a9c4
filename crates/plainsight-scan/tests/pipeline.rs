//! End-to-end scans against fake page capabilities and a mock analyzer

use plainsight_extract::{DocumentKind, ExtractError, ExtractResult, Extractor};
use plainsight_scan::{
    AnalyzerClient, AnalyzerConfig, BrowserCookie, CookieStore, EvidenceCollector, FlowId,
    GlobalValue, PageAccess, PageGlobals, Pipeline, RawAnchor, ResultView, SameSite, ScanBoard,
    ScanError, ScanFailure, ScanState, Tab, TabId,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FakePage {
    tab: Tab,
    anchors: Vec<RawAnchor>,
    cookie_string: String,
    globals: PageGlobals,
    gate: Option<Arc<Notify>>,
    fail_cookie_read: bool,
    fail_globals: bool,
}

impl FakePage {
    fn new(url: &str, anchors: Vec<RawAnchor>) -> Self {
        Self {
            tab: Tab::new(7, url),
            anchors,
            cookie_string: String::new(),
            globals: PageGlobals::new(),
            gate: None,
            fail_cookie_read: false,
            fail_globals: false,
        }
    }
}

#[async_trait::async_trait]
impl PageAccess for FakePage {
    async fn active_tab(&self) -> plainsight_scan::Result<Tab> {
        Ok(self.tab.clone())
    }

    async fn list_anchors(&self, _tab: TabId) -> plainsight_scan::Result<Vec<RawAnchor>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.anchors.clone())
    }

    async fn read_dom_cookie_string(&self, _tab: TabId) -> plainsight_scan::Result<String> {
        if self.fail_cookie_read {
            return Err(ScanError::PageAccess("document.cookie is not readable".into()));
        }
        Ok(self.cookie_string.clone())
    }

    async fn inspect_globals(
        &self,
        _tab: TabId,
        _names: &[String],
    ) -> plainsight_scan::Result<PageGlobals> {
        if self.fail_globals {
            return Err(ScanError::PageAccess("globals probe was blocked".into()));
        }
        Ok(self.globals.clone())
    }
}

#[derive(Default)]
struct FakeCookies {
    cookies: Vec<BrowserCookie>,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CookieStore for FakeCookies {
    async fn get_all_cookies(&self, _url: &Url) -> plainsight_scan::Result<Vec<BrowserCookie>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ScanError::CookieStore("permission denied".into()));
        }
        Ok(self.cookies.clone())
    }
}

/// Extractor returning fixed text, or a fixed error
struct FakeExtractor {
    error: Option<fn() -> ExtractError>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    fn text() -> Self {
        Self {
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(error: fn() -> ExtractError) -> Self {
        Self {
            error: Some(error),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, source: &str) -> plainsight_extract::Result<ExtractResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.error {
            return Err(error());
        }
        Ok(ExtractResult::new(
            "We share your data with advertising partners.".into(),
            source,
            DocumentKind::from_url(source),
        ))
    }
}

fn pipeline(
    page: FakePage,
    cookies: Arc<FakeCookies>,
    extractor: Arc<FakeExtractor>,
    analyzer_url: &str,
) -> Pipeline {
    let page: Arc<FakePage> = Arc::new(page);
    let evidence = EvidenceCollector::new(page.clone(), cookies);
    let analyzer =
        AnalyzerClient::new(AnalyzerConfig::default().with_base_url(analyzer_url)).unwrap();
    Pipeline::new(page, evidence, extractor, analyzer)
}

fn policy_anchors() -> Vec<RawAnchor> {
    vec![
        RawAnchor::new("Terms of Service", "https://www.example.com/terms"),
        RawAnchor::new("  Privacy Policy ", "https://www.example.com/privacy"),
        RawAnchor::new("Shop", "https://www.example.com/shop"),
    ]
}

#[tokio::test]
async fn test_full_scan_renders_both_sections() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/policy/analyze"))
        .and(body_partial_json(json!({"url": "https://www.example.com/privacy"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary_simple": "Data is shared with advertisers.",
            "key_takeaways": ["Sells data"],
            "policy_risk_score": 80,
            "risk_level": "high"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cookies/analyze"))
        .and(body_partial_json(json!({
            "site_domain": "example.com",
            "cmp_detected": "onetrust",
            "cookies": [{"name": "_ga", "sameSite": "Lax", "secure": true}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Tracking cookies set before consent.",
            "risk_level": "medium",
            "flags": ["preconsent_tracking"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut page = FakePage::new("https://www.example.com/", policy_anchors());
    page.cookie_string = "OptanonConsent=x; theme=dark".into();
    page.globals = PageGlobals::new()
        .with("OneTrust", GlobalValue::Truthy)
        .with("__tcfapi", GlobalValue::Function);
    let cookies = Arc::new(FakeCookies {
        cookies: vec![BrowserCookie::new("_ga", ".example.com")
            .secure(true)
            .same_site(SameSite::Lax)],
        ..Default::default()
    });

    let pipeline = pipeline(page, cookies, Arc::new(FakeExtractor::text()), &server.uri());
    let update = pipeline.run().await;

    let ScanState::Rendered { report } = &update.state else {
        panic!("expected rendered state, got {:?}", update.state);
    };
    assert_eq!(report.policy_link.text, "Privacy Policy");
    assert_eq!(report.evidence.dom_cookies.len(), 2);
    assert_eq!(report.evidence.cmp.consent_cookies, vec!["OptanonConsent"]);
    assert_eq!(report.evidence.cmp.detected_apis(), vec!["tcf"]);

    let text = ResultView::build(report).to_string();
    assert!(text.contains("Data is shared with advertisers."));
    assert!(text.contains("preconsent_tracking"));
    assert_eq!(pipeline.board().current(), update);
}

#[tokio::test]
async fn test_cookie_analyzer_failure_keeps_policy_section() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/policy/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"risk_level": "low"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cookies/analyze"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let page = FakePage::new("https://www.example.com/", policy_anchors());
    let pipeline = pipeline(
        page,
        Arc::new(FakeCookies::default()),
        Arc::new(FakeExtractor::text()),
        &server.uri(),
    );

    let ScanState::Rendered { report } = pipeline.run().await.state else {
        panic!("expected rendered state");
    };
    assert_eq!(
        report.results.policy.success().unwrap().risk_level.as_deref(),
        Some("low")
    );
    assert_eq!(
        report.results.cookies.error(),
        Some("Analyzer returned HTTP 500: Internal Server Error")
    );
}

#[tokio::test]
async fn test_policy_analyzer_failure_keeps_cookie_section() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/policy/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "text too short"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cookies/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"flags": ["long_retention"]})))
        .mount(&server)
        .await;

    let page = FakePage::new("https://www.example.com/", policy_anchors());
    let cookies = Arc::new(FakeCookies {
        fail: true,
        ..Default::default()
    });
    let pipeline = pipeline(page, cookies, Arc::new(FakeExtractor::text()), &server.uri());

    let ScanState::Rendered { report } = pipeline.run().await.state else {
        panic!("expected rendered state");
    };
    assert_eq!(report.results.policy.error(), Some("text too short"));
    assert_eq!(
        report.results.cookies.success().unwrap().flags,
        vec!["long_retention"]
    );
    // Cookie store failure degrades to no cookies
    assert!(report.cookie_payload.cookies.is_empty());
}

async fn mount_ok_analyzers(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/policy/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"risk_level": "low"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cookies/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"risk_level": "low"})))
        .mount(server)
        .await;
}

fn consent_page() -> FakePage {
    let mut page = FakePage::new("https://www.example.com/", policy_anchors());
    page.cookie_string = "OptanonConsent=x; theme=dark".into();
    page.globals = PageGlobals::new()
        .with("OneTrust", GlobalValue::Truthy)
        .with("__tcfapi", GlobalValue::Function);
    page
}

fn one_browser_cookie() -> Arc<FakeCookies> {
    Arc::new(FakeCookies {
        cookies: vec![BrowserCookie::new("_ga", ".example.com")],
        ..Default::default()
    })
}

#[tokio::test]
async fn test_dom_cookie_failure_leaves_other_evidence_intact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cookies/analyze"))
        .and(body_partial_json(json!({"cmp_detected": "onetrust"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"risk_level": "low"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/policy/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"risk_level": "low"})))
        .mount(&server)
        .await;

    let mut page = consent_page();
    page.fail_cookie_read = true;
    let pipeline = pipeline(
        page,
        one_browser_cookie(),
        Arc::new(FakeExtractor::text()),
        &server.uri(),
    );

    let ScanState::Rendered { report } = pipeline.run().await.state else {
        panic!("expected rendered state");
    };
    assert!(report.evidence.dom_cookies.is_empty());
    assert!(report.evidence.cmp.consent_cookies.is_empty());
    assert_eq!(report.evidence.cmp.detected_providers(), vec!["onetrust"]);
    assert_eq!(report.evidence.cmp.page, "www.example.com");
    assert_eq!(report.evidence.browser_cookies.len(), 1);
    assert_eq!(report.cookie_payload.cmp_detected, "onetrust");
}

#[tokio::test]
async fn test_globals_failure_leaves_other_evidence_intact() {
    let server = MockServer::start().await;
    mount_ok_analyzers(&server).await;

    let mut page = consent_page();
    page.fail_globals = true;
    let pipeline = pipeline(
        page,
        one_browser_cookie(),
        Arc::new(FakeExtractor::text()),
        &server.uri(),
    );

    let ScanState::Rendered { report } = pipeline.run().await.state else {
        panic!("expected rendered state");
    };
    assert_eq!(report.evidence.dom_cookies.len(), 2);
    assert!(report.evidence.cmp.detected_providers().is_empty());
    assert!(report.evidence.cmp.page.is_empty());
    assert_eq!(report.evidence.browser_cookies.len(), 1);
    assert_eq!(report.cookie_payload.cmp_detected, "unknown");
}

#[tokio::test]
async fn test_no_anchors_makes_no_network_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let page = FakePage::new("https://www.example.com/", vec![]);
    let cookies = Arc::new(FakeCookies::default());
    let extractor = Arc::new(FakeExtractor::text());
    let pipeline = pipeline(page, cookies.clone(), extractor.clone(), &server.uri());

    let update = pipeline.run().await;
    assert_eq!(
        update.state,
        ScanState::Failed {
            failure: ScanFailure::NoCandidate
        }
    );
    assert_eq!(cookies.calls.load(Ordering::SeqCst), 0);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_restricted_tab() {
    let page = FakePage::new("chrome://extensions/", policy_anchors());
    let pipeline = pipeline(
        page,
        Arc::new(FakeCookies::default()),
        Arc::new(FakeExtractor::text()),
        "http://127.0.0.1:9",
    );

    let update = pipeline.run().await;
    assert_eq!(
        update.state,
        ScanState::Failed {
            failure: ScanFailure::Restricted {
                url: "chrome://extensions/".into()
            }
        }
    );
}

#[tokio::test]
async fn test_fetch_and_decode_failures_are_distinct() {
    let fetch = pipeline(
        FakePage::new("https://www.example.com/", policy_anchors()),
        Arc::new(FakeCookies::default()),
        Arc::new(FakeExtractor::failing(|| ExtractError::Http {
            status: 404,
            message: "Not Found".into(),
        })),
        "http://127.0.0.1:9",
    );
    let ScanState::Failed { failure } = fetch.run().await.state else {
        panic!("expected failure");
    };
    assert!(matches!(failure, ScanFailure::DocumentFetch { .. }));

    let decode = pipeline(
        FakePage::new("https://www.example.com/", policy_anchors()),
        Arc::new(FakeCookies::default()),
        Arc::new(FakeExtractor::failing(|| {
            ExtractError::Pdf("invalid file header".into())
        })),
        "http://127.0.0.1:9",
    );
    let ScanState::Failed { failure } = decode.run().await.state else {
        panic!("expected failure");
    };
    match failure {
        ScanFailure::DocumentDecode { url, message } => {
            assert_eq!(url, "https://www.example.com/privacy");
            assert!(message.contains("invalid file header"));
        }
        other => panic!("expected decode failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stale_flow_does_not_overwrite_newer_scan() {
    let board = Arc::new(ScanBoard::new());
    let gate = Arc::new(Notify::new());

    // First scan blocks while listing anchors
    let mut slow_page = FakePage::new("https://slow.example/", policy_anchors());
    slow_page.gate = Some(gate.clone());
    let slow = Arc::new(
        pipeline(
            slow_page,
            Arc::new(FakeCookies::default()),
            Arc::new(FakeExtractor::text()),
            "http://127.0.0.1:9",
        )
        .with_board(board.clone()),
    );
    let mut rx = board.subscribe();
    let slow_task = tokio::spawn({
        let slow = slow.clone();
        async move { slow.run().await }
    });
    rx.wait_for(|u| u.flow == FlowId(1) && u.state == ScanState::Scanning)
        .await
        .unwrap();

    // Second scan completes while the first is still waiting
    let fast = pipeline(
        FakePage::new("https://fast.example/", vec![]),
        Arc::new(FakeCookies::default()),
        Arc::new(FakeExtractor::text()),
        "http://127.0.0.1:9",
    )
    .with_board(board.clone());
    let fast_update = fast.run().await;
    assert_eq!(fast_update.flow, FlowId(2));

    gate.notify_one();
    let slow_update = slow_task.await.unwrap();
    assert_eq!(slow_update.flow, FlowId(1));
    assert!(slow_update.state.is_terminal());

    let current = board.current();
    assert_eq!(current.flow, FlowId(2));
    assert_eq!(
        current.state,
        ScanState::Failed {
            failure: ScanFailure::NoCandidate
        }
    );
}
