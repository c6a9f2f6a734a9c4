//! # PlainSight Scan
//!
//! Finds the legal policy linked from a page, gathers its cookie and consent
//! evidence, and sends both to the analyzer services.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ Link Scanner │ ─►│ Link Selector│ ─►│ Evidence Collector │
//! └──────────────┘   └──────────────┘   │  DOM cookies       │
//!                                       │  browser cookies   │
//!                                       │  CMP probe         │
//!                                       └─────────┬──────────┘
//!                                                 ▼
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │   Renderer   │ ◄─│   Analyzer   │ ◄─│ Content Extractor  │
//! │              │   │  policy ║    │   │ + Payload Builder  │
//! │              │   │  cookies     │   │                    │
//! └──────────────┘   └──────────────┘   └────────────────────┘
//! ```
//!
//! The host environment plugs in through [`PageAccess`] and [`CookieStore`];
//! document downloads go through [`plainsight_extract::DocumentFetcher`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use plainsight_scan::{AnalyzerClient, AnalyzerConfig, EvidenceCollector, Pipeline};
//!
//! let evidence = EvidenceCollector::new(page.clone(), cookies);
//! let analyzer = AnalyzerClient::new(AnalyzerConfig::default())?;
//! let pipeline = Pipeline::new(page, evidence, extractor, analyzer);
//! let update = pipeline.run().await;
//! println!("{}", plainsight_scan::render_state(&update.state));
//! ```

pub mod analyzer;
pub mod capability;
pub mod cmp;
pub mod error;
pub mod evidence;
pub mod payload;
pub mod pipeline;
pub mod render;
pub mod scanner;
pub mod selector;
pub mod types;

pub use analyzer::{
    AnalysisResults, AnalyzerClient, AnalyzerConfig, AnalyzerResult, CookieReport, PolicySummary,
};
pub use capability::{CookieStore, GlobalValue, PageAccess, PageGlobals};
pub use cmp::{CmpInfo, CmpProbe, GlobalCheck};
pub use error::{AnalyzerError, Result, ScanError};
pub use evidence::{Evidence, EvidenceCollector};
pub use payload::{CookieAnalyzerPayload, NormalizedCookie, PolicyPayload};
pub use pipeline::{FlowId, FlowUpdate, Pipeline, ScanBoard, ScanFailure, ScanReport, ScanState};
pub use render::{render_state, ResultView};
pub use scanner::{scan_tab, ScanOutcome};
pub use selector::select_link;
pub use types::{BrowserCookie, DomCookie, LinkCandidate, RawAnchor, SameSite, Tab, TabId};
