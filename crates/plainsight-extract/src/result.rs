//! Extraction result types

use crate::DocumentKind;
use serde::{Deserialize, Serialize};

/// Plain text extracted from a policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    /// The extracted text content
    pub text: String,

    /// Source URL
    pub source: String,

    /// Which extractor produced the text
    pub kind: DocumentKind,

    /// Content type reported by the server
    pub content_type: Option<String>,

    /// Original document length in bytes
    pub original_length: usize,

    /// Extracted text length in characters
    pub text_length: usize,

    /// Document title (`<title>` for HTML)
    pub title: Option<String>,

    /// Number of pages (PDF only)
    pub page_count: Option<usize>,
}

impl ExtractResult {
    /// Create a new extraction result
    pub fn new(text: String, source: impl Into<String>, kind: DocumentKind) -> Self {
        let text_length = text.chars().count();
        Self {
            text,
            source: source.into(),
            kind,
            content_type: None,
            original_length: 0,
            text_length,
            title: None,
            page_count: None,
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the original length
    pub fn with_original_length(mut self, length: usize) -> Self {
        self.original_length = length;
        self
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the page count
    pub fn with_page_count(mut self, pages: usize) -> Self {
        self.page_count = Some(pages);
        self
    }
}
