//! HTML policy page extraction

use crate::{error::Result, DocumentFetcher, DocumentKind, ExtractError, ExtractResult, Extractor};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

/// Elements whose content never shows up as rendered text
const SKIP_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line when rendered
const BLOCK_TAGS: [&str; 24] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol", "p", "section", "ul",
];

/// HTML document extractor
pub struct HtmlExtractor {
    fetcher: Arc<dyn DocumentFetcher>,
}

impl HtmlExtractor {
    /// Create a new HTML extractor backed by the given fetcher
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extract the rendered body text from already fetched markup
    pub fn extract_from_html(&self, html: &str, source: &str) -> Result<ExtractResult> {
        let (text, title) = html_to_text(html)?;
        let mut result =
            ExtractResult::new(text, source, DocumentKind::Html).with_original_length(html.len());
        if let Some(title) = title {
            result = result.with_title(title);
        }
        Ok(result)
    }
}

/// Convert markup into the text a browser would render for `<body>`, plus the `<title>`
pub fn html_to_text(html: &str) -> Result<(String, Option<String>)> {
    let document = Html::parse_document(html);

    let title_selector = selector("title")?;
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let body_selector = selector("body")?;
    let mut raw = String::new();
    match document.select(&body_selector).next() {
        Some(body) => render_element(&body, &mut raw),
        None => render_element(&document.root_element(), &mut raw),
    }

    Ok((clean_text(&raw), title))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ExtractError::Parse(format!("{:?}", e)))
}

/// Append the visible text of an element, breaking lines around block elements
fn render_element(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child_element) = ElementRef::wrap(child) else {
            continue;
        };
        let tag = child_element.value().name();
        if SKIP_TAGS.contains(&tag) {
            continue;
        }
        if tag == "br" {
            out.push('\n');
            continue;
        }

        let block = BLOCK_TAGS.contains(&tag) || matches!(tag, "tr" | "table");
        if block {
            out.push('\n');
        } else if matches!(tag, "td" | "th") {
            out.push(' ');
        }
        render_element(&child_element, out);
        if block {
            out.push('\n');
        }
    }
}

/// Collapse runs of whitespace inside each line and drop empty lines
fn clean_text(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait::async_trait]
impl Extractor for HtmlExtractor {
    async fn extract(&self, source: &str) -> Result<ExtractResult> {
        let fetched = self.fetcher.fetch_text(source).await?;
        let mut result = self.extract_from_html(&fetched.body, source)?;
        if let Some(ct) = fetched.content_type {
            result = result.with_content_type(ct);
        }
        Ok(result)
    }
}
