//! PDF policy document extraction

use crate::{
    error::{ExtractError, Result},
    DocumentFetcher, DocumentKind, ExtractResult, Extractor,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Text recovered from one PDF page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfPage {
    /// 1-based page number
    pub index: u32,
    /// Text items in reading order
    pub items: Vec<String>,
}

/// Turns PDF bytes into page-ordered text items
pub trait PdfDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<PdfPage>>;
}

/// [`PdfDecoder`] backed by `lopdf`
#[cfg(feature = "pdf")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfDecoder;

#[cfg(feature = "pdf")]
impl PdfDecoder for LopdfDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<PdfPage>> {
        let doc = lopdf::Document::load_mem(bytes)?;
        let page_count = doc.get_pages().len() as u32;
        collect_pages(page_count, |index| {
            doc.extract_text(&[index]).map_err(|e| e.to_string())
        })
    }
}

/// Split each page's text into trimmed lines.
///
/// A page that fails to decode contributes no items, unless every page
/// fails, in which case the document is undecodable.
#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
fn collect_pages<F>(page_count: u32, mut page_text: F) -> Result<Vec<PdfPage>>
where
    F: FnMut(u32) -> std::result::Result<String, String>,
{
    let mut pages = Vec::with_capacity(page_count as usize);
    let mut last_error = None;
    for index in 1..=page_count {
        let items = match page_text(index) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                tracing::debug!(page = index, error = %e, "skipping undecodable page");
                last_error = Some(e);
                continue;
            }
        };
        pages.push(PdfPage { index, items });
    }

    match last_error {
        Some(e) if pages.is_empty() => Err(ExtractError::Pdf(format!(
            "no readable pages out of {}: {}",
            page_count, e
        ))),
        _ => Ok(pages),
    }
}

/// Join decoded pages: items space-joined within a page, pages separated by a blank line
pub fn join_pages(pages: &[PdfPage]) -> String {
    let mut ordered: Vec<&PdfPage> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);
    ordered
        .iter()
        .map(|page| page.items.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// PDF document extractor
pub struct PdfExtractor {
    fetcher: Arc<dyn DocumentFetcher>,
    decoder: Arc<dyn PdfDecoder>,
}

impl PdfExtractor {
    /// Create a new PDF extractor with an explicit decoder
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, decoder: Arc<dyn PdfDecoder>) -> Self {
        Self { fetcher, decoder }
    }

    /// Extract text from PDF bytes
    pub fn extract_from_bytes(&self, bytes: &[u8], source: &str) -> Result<ExtractResult> {
        let pages = self.decoder.decode(bytes)?;
        let text = join_pages(&pages);

        Ok(ExtractResult::new(text, source, DocumentKind::Pdf)
            .with_content_type("application/pdf")
            .with_original_length(bytes.len())
            .with_page_count(pages.len()))
    }
}

#[async_trait::async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, source: &str) -> Result<ExtractResult> {
        let fetched = self.fetcher.fetch_bytes(source).await?;
        self.extract_from_bytes(&fetched.body, source)
    }
}
