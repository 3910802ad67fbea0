// Preprocessor abstraction for document loading
//
// This module defines the boundary between document parsing (bytes -> tree)
// and scoring (tree -> scores). Everything after this point works with an
// HtmlDocument and never sees the raw bytes.

use crate::types::HtmlDocument;
use anyhow::{Context, Result};
use std::path::Path;

/// Preprocessor trait - converts raw documents to an `HtmlDocument`
///
/// The preprocessing happens in two clear steps:
/// 1. Bytes -> markup string (character decoding)
/// 2. Markup -> HtmlDocument (tree construction)
pub trait Preprocessor {
    /// Step 1: Decode raw bytes into markup text
    fn decode_to_markup(&self, bytes: &[u8]) -> Result<String>;

    /// Step 2: Build the element arena from markup
    fn parse_markup(&self, markup: &str) -> Result<HtmlDocument>;

    /// Full document processing (combines both steps)
    fn process(&self, bytes: &[u8]) -> Result<HtmlDocument> {
        let markup = self.decode_to_markup(bytes)?;
        self.parse_markup(&markup)
    }

    /// Reads file and processes the bytes
    fn process_file(&self, input: &Path) -> Result<HtmlDocument> {
        let bytes = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        self.process(&bytes)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
