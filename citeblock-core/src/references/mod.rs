//! Reference parsing
//!
//! Turns selected candidate text into structured `Citation` records by
//! handing it to an external reference-string parser. The parser is a
//! trait so the pipeline can be driven by ParsCit in production and by a
//! canned implementation in tests.

pub mod parscit;

pub use parscit::{parse_citation_xml, ParsCitParser};

use crate::types::{CandidateRecord, Citation};
use anyhow::Result;
use tracing::{debug, warn};

pub trait ReferenceParser {
    /// Parse one block of reference text. An empty result is not an error.
    fn parse(&self, text: &str) -> Result<Vec<Citation>>;

    /// Get parser name for debugging/logging
    fn name(&self) -> &str;
}

/// Parse every record, attaching the original text and filename to each
/// citation. Failures are logged per record and never stop the batch.
pub fn parse_records(parser: &dyn ReferenceParser, records: &[CandidateRecord]) -> Vec<Citation> {
    let mut citations = Vec::new();

    for record in records {
        let parsed = match parser.parse(&record.citation) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    parser = parser.name(),
                    filename = record.filename.as_deref().unwrap_or("-"),
                    "reference parser failed: {err:#}\n{}",
                    record.citation
                );
                continue;
            }
        };

        if parsed.is_empty() {
            warn!(
                filename = record.filename.as_deref().unwrap_or("-"),
                "nothing extracted from:\n{}", record.citation
            );
            continue;
        }

        debug!(count = parsed.len(), "citations parsed");
        citations.extend(parsed.into_iter().map(|mut citation| {
            citation.original = record.citation.clone();
            citation.filename = record.filename.clone();
            citation
        }));
    }

    citations
}
