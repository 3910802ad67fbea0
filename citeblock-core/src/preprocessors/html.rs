//! HTML preprocessor backed by `scraper`.
//!
//! The parsed html5ever tree is flattened into an `HtmlDocument` arena in
//! pre-order. Text nodes are appended to one shared buffer as they are met,
//! so each element's aggregated text is the slice between its open and
//! close. The walk uses an explicit stack; deeply nested pages cannot
//! overflow the call stack.

use super::preprocessor::Preprocessor;
use crate::types::{ElementId, HtmlDocument};
use anyhow::{bail, Result};
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

enum Step<'a> {
    Open(ElementRef<'a>, Option<ElementId>),
    Text(&'a str),
    Close(ElementId),
}

/// Flatten a parsed scraper tree into an element arena
pub fn build_document(html: &Html) -> HtmlDocument {
    let mut document = HtmlDocument::new();
    let mut stack = vec![Step::Open(html.root_element(), None)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Open(element, parent) => {
                let value = element.value();
                let attributes: HashMap<String, String> = value
                    .attrs()
                    .map(|(name, val)| (name.to_ascii_lowercase(), val.to_string()))
                    .collect();
                let id = document.push_element(value.name(), attributes, parent);
                stack.push(Step::Close(id));

                // Reversed so the first child is popped first
                let children: Vec<_> = element.children().collect();
                for child in children.into_iter().rev() {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        stack.push(Step::Open(child_element, Some(id)));
                    } else if let Some(text) = child.value().as_text() {
                        stack.push(Step::Text(&**text));
                    }
                }
            }
            Step::Text(text) => document.push_text(text),
            Step::Close(id) => document.close_element(id),
        }
    }

    document
}

/// Parse markup straight into an arena
pub fn parse_html(markup: &str) -> HtmlDocument {
    let html = Html::parse_document(markup);
    if !html.errors.is_empty() {
        debug!(errors = html.errors.len(), "recovered from malformed markup");
    }
    build_document(&html)
}

#[derive(Debug, Default, Clone)]
pub struct HtmlPreprocessor;

impl HtmlPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for HtmlPreprocessor {
    /// Lossy UTF-8. Encoding sniffing is left to whoever hands us the bytes.
    fn decode_to_markup(&self, bytes: &[u8]) -> Result<String> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(markup) => Ok(markup.to_string()),
            Err(err) => {
                warn!(valid_up_to = err.valid_up_to(), "input is not valid UTF-8, decoding lossily");
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    fn parse_markup(&self, markup: &str) -> Result<HtmlDocument> {
        if markup.trim().is_empty() {
            bail!("Document is empty");
        }
        let document = parse_html(markup);
        debug!(elements = document.len(), "html parsed");
        Ok(document)
    }

    fn name(&self) -> &str {
        "HtmlPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension() {
            matches!(
                extension.to_str().unwrap_or("").to_lowercase().as_str(),
                "html" | "htm" | "xhtml" | "shtml"
            )
        } else {
            false
        }
    }
}
