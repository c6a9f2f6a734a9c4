//! # PlainSight Extract
//!
//! Fetches a policy document and turns it into plain text.
//!
//! Two extractors are provided, selected by the document URL:
//!
//! - **HTML**: the rendered body text of a policy page
//! - **PDF**: page-ordered text decoded from a PDF document
//!
//! ## Example
//!
//! ```rust,ignore
//! use plainsight_extract::{ContentExtractor, ExtractorConfig, HttpFetcher};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(HttpFetcher::new(ExtractorConfig::default())?);
//!     let extractor = ContentExtractor::new(fetcher);
//!     let result = extractor.extract("https://example.com/privacy").await?;
//!     println!("Extracted: {}", result.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │  Policy URL │ ──► │ DocumentKind │ ──► │ HtmlExtractor   │
//! └─────────────┘     │  (suffix)    │     │ PdfExtractor    │
//!                     └──────────────┘     └─────────────────┘
//!                                                   │
//!                                                   ▼
//!                                          ┌─────────────────┐
//!                                          │  ExtractResult  │
//!                                          └─────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod pdf;
pub mod result;
pub mod web;

pub use config::ExtractorConfig;
pub use error::{ExtractError, FailureKind, Result};
pub use fetch::{DocumentFetcher, Fetched, HttpFetcher};
pub use pdf::{PdfDecoder, PdfExtractor, PdfPage};
pub use result::ExtractResult;
pub use web::HtmlExtractor;

#[cfg(feature = "pdf")]
pub use pdf::LopdfDecoder;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Common trait for all extractors
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch the document at `source` and extract its text
    async fn extract(&self, source: &str) -> Result<ExtractResult>;
}

/// Kind of policy document, decided from its URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Html,
    Pdf,
}

impl DocumentKind {
    /// `.pdf` suffix (case-insensitive) selects PDF; everything else is HTML.
    ///
    /// The suffix is checked on the URL path, so query strings and fragments
    /// do not hide it. Unparseable input is checked as a raw string.
    pub fn from_url(url: &str) -> Self {
        let target = match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_ascii_lowercase(),
            Err(_) => url.to_ascii_lowercase(),
        };
        if target.ends_with(".pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Html
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Html => write!(f, "HTML"),
            DocumentKind::Pdf => write!(f, "PDF"),
        }
    }
}

/// Dispatches to the HTML or PDF extractor based on [`DocumentKind::from_url`]
pub struct ContentExtractor {
    html: HtmlExtractor,
    pdf: PdfExtractor,
}

impl ContentExtractor {
    /// Create an extractor that decodes PDFs with `lopdf`
    #[cfg(feature = "pdf")]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self::with_decoder(fetcher, Arc::new(LopdfDecoder))
    }

    /// Create an extractor with a custom PDF decoder
    pub fn with_decoder(fetcher: Arc<dyn DocumentFetcher>, decoder: Arc<dyn PdfDecoder>) -> Self {
        Self {
            html: HtmlExtractor::new(fetcher.clone()),
            pdf: PdfExtractor::new(fetcher, decoder),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for ContentExtractor {
    async fn extract(&self, source: &str) -> Result<ExtractResult> {
        let kind = DocumentKind::from_url(source);
        tracing::debug!(%source, %kind, "extracting policy document");
        match kind {
            DocumentKind::Pdf => self.pdf.extract(source).await,
            DocumentKind::Html => self.html.extract(source).await,
        }
    }
}
