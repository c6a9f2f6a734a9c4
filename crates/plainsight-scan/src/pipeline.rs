//! Scan orchestration
//!
//! One scan walks an explicit state machine:
//!
//! ```text
//! Idle → Scanning → Selecting → CollectingEvidence → Extracting → Analyzing → Rendered
//!           │           │                                 │
//!           └───────────┴──────────── Failed ◄────────────┘
//! ```
//!
//! Every scan is a flow with its own [`FlowId`]. The [`ScanBoard`] only
//! accepts updates from the latest flow, so a slow earlier scan can never
//! overwrite the display state of a newer one.

use crate::analyzer::{AnalysisResults, AnalyzerClient};
use crate::capability::PageAccess;
use crate::evidence::{Evidence, EvidenceCollector};
use crate::payload::{
    build_cookie_payload, build_policy_payload, CookieAnalyzerPayload, PolicyPayload,
};
use crate::scanner::{scan_tab, ScanOutcome};
use crate::selector::select_link;
use crate::types::LinkCandidate;
use chrono::Utc;
use plainsight_extract::{DocumentKind, ExtractError, Extractor, FailureKind};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// Monotonically increasing scan identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FlowId(pub u64);

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a scan ended without analyzer results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ScanFailure {
    /// The tab is not a web page
    Restricted { url: String },
    /// No policy-looking link on the page
    NoCandidate,
    /// The page could not be inspected at all
    PageAccess { message: String },
    /// The policy document could not be downloaded
    DocumentFetch { url: String, message: String },
    /// The policy document downloaded but could not be read
    DocumentDecode { url: String, message: String },
}

impl ScanFailure {
    fn from_extract(url: &Url, err: ExtractError) -> Self {
        let url = url.to_string();
        let message = err.to_string();
        match err.kind() {
            FailureKind::Fetch => ScanFailure::DocumentFetch { url, message },
            FailureKind::Decode => ScanFailure::DocumentDecode { url, message },
        }
    }

    /// Restricted pages and pages without policy links are expected outcomes
    pub fn is_no_op(&self) -> bool {
        matches!(self, ScanFailure::Restricted { .. } | ScanFailure::NoCandidate)
    }
}

/// Everything a completed scan produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub policy_link: LinkCandidate,
    pub document_kind: DocumentKind,
    pub evidence: Evidence,
    pub policy_payload: PolicyPayload,
    pub cookie_payload: CookieAnalyzerPayload,
    pub results: AnalysisResults,
}

/// Pipeline state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Scanning,
    Selecting { candidates: usize },
    CollectingEvidence { policy_url: Url },
    Extracting { policy_url: Url, kind: DocumentKind },
    Analyzing { policy_url: Url },
    Rendered { report: Box<ScanReport> },
    Failed { failure: ScanFailure },
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Rendered { .. } | ScanState::Failed { .. })
    }

    fn failed(failure: ScanFailure) -> Self {
        ScanState::Failed { failure }
    }
}

/// A state tagged with the flow that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowUpdate {
    pub flow: FlowId,
    pub state: ScanState,
}

/// Display state shared between scans and the presentation layer
pub struct ScanBoard {
    latest: AtomicU64,
    tx: watch::Sender<FlowUpdate>,
}

impl Default for ScanBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FlowUpdate {
            flow: FlowId(0),
            state: ScanState::Idle,
        });
        Self {
            latest: AtomicU64::new(0),
            tx,
        }
    }

    /// Start a new flow; every earlier flow becomes stale
    pub fn begin(&self) -> FlowId {
        FlowId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `flow` is still the newest flow
    pub fn is_current(&self, flow: FlowId) -> bool {
        self.latest.load(Ordering::SeqCst) == flow.0
    }

    /// Publish a state for `flow`. Returns false, and changes nothing, for stale flows.
    pub fn publish(&self, flow: FlowId, state: ScanState) -> bool {
        // Checked under the channel's write lock so a newer flow's update
        // can never be replaced by one from a flow that was current a moment ago
        let published = self.tx.send_if_modified(|current| {
            if current.flow <= flow && self.is_current(flow) {
                *current = FlowUpdate { flow, state };
                true
            } else {
                false
            }
        });
        if !published {
            debug!(%flow, "discarding update from stale flow");
        }
        published
    }

    /// Whether the newest flow has not reached a terminal state yet
    pub fn in_progress(&self) -> bool {
        let current = self.tx.borrow();
        current.flow.0 != 0 && !current.state.is_terminal()
    }

    pub fn current(&self) -> FlowUpdate {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowUpdate> {
        self.tx.subscribe()
    }
}

/// Runs scans end to end
pub struct Pipeline {
    page: Arc<dyn PageAccess>,
    evidence: EvidenceCollector,
    extractor: Arc<dyn Extractor>,
    analyzer: AnalyzerClient,
    board: Arc<ScanBoard>,
}

impl Pipeline {
    pub fn new(
        page: Arc<dyn PageAccess>,
        evidence: EvidenceCollector,
        extractor: Arc<dyn Extractor>,
        analyzer: AnalyzerClient,
    ) -> Self {
        Self {
            page,
            evidence,
            extractor,
            analyzer,
            board: Arc::new(ScanBoard::new()),
        }
    }

    /// Share an existing board, e.g. one a UI already subscribed to
    pub fn with_board(mut self, board: Arc<ScanBoard>) -> Self {
        self.board = board;
        self
    }

    pub fn board(&self) -> Arc<ScanBoard> {
        self.board.clone()
    }

    /// Run one scan and return its terminal state
    pub async fn run(&self) -> FlowUpdate {
        let flow = self.board.begin();
        info!(%flow, "scan started");

        let state = self.run_flow(flow).await;
        match &state {
            ScanState::Failed { failure } if failure.is_no_op() => {
                info!(%flow, ?failure, "scan finished without a policy")
            }
            ScanState::Failed { failure } => warn!(%flow, ?failure, "scan failed"),
            _ => info!(%flow, "scan complete"),
        }

        self.board.publish(flow, state.clone());
        FlowUpdate { flow, state }
    }

    async fn run_flow(&self, flow: FlowId) -> ScanState {
        self.board.publish(flow, ScanState::Scanning);

        let tab = match self.page.active_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                return ScanState::failed(ScanFailure::PageAccess {
                    message: e.to_string(),
                })
            }
        };

        let candidates = match scan_tab(self.page.as_ref(), &tab).await {
            Ok(ScanOutcome::Restricted { url }) => {
                return ScanState::failed(ScanFailure::Restricted { url })
            }
            Ok(ScanOutcome::Candidates(candidates)) => candidates,
            Err(e) => {
                return ScanState::failed(ScanFailure::PageAccess {
                    message: e.to_string(),
                })
            }
        };

        self.board.publish(
            flow,
            ScanState::Selecting {
                candidates: candidates.len(),
            },
        );
        let Some(link) = select_link(&candidates).cloned() else {
            return ScanState::failed(ScanFailure::NoCandidate);
        };
        info!(%flow, text = %link.text, href = %link.href, "selected policy link");

        let policy_url = link.href.clone();
        self.board.publish(
            flow,
            ScanState::CollectingEvidence {
                policy_url: policy_url.clone(),
            },
        );
        let evidence = self.evidence.collect(&tab, &policy_url).await;

        let kind = DocumentKind::from_url(policy_url.as_str());
        self.board.publish(
            flow,
            ScanState::Extracting {
                policy_url: policy_url.clone(),
                kind,
            },
        );
        let document = match self.extractor.extract(policy_url.as_str()).await {
            Ok(document) => document,
            Err(e) => return ScanState::failed(ScanFailure::from_extract(&policy_url, e)),
        };
        debug!(%flow, chars = document.text_length, "extracted policy text");

        let captured_at = Utc::now();
        let policy_payload = build_policy_payload(&policy_url, &document, captured_at);
        let cookie_payload = build_cookie_payload(
            &policy_url,
            &evidence.browser_cookies,
            &evidence.cmp,
            captured_at,
        );

        self.board.publish(
            flow,
            ScanState::Analyzing {
                policy_url: policy_url.clone(),
            },
        );
        let results = self.analyzer.analyze(&policy_payload, &cookie_payload).await;

        ScanState::Rendered {
            report: Box::new(ScanReport {
                policy_link: link,
                document_kind: kind,
                evidence,
                policy_payload,
                cookie_payload,
                results,
            }),
        }
    }
}
