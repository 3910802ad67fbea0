//! Solr indexer - submits parsed citations to a JSON update endpoint
//!
//! Citations are posted in small batches, each followed by a commit
//! (`GET <url>?commit=true`). A failed batch is logged and the remaining
//! batches are still submitted.

use citeblock_core::config::IndexerConfig;
use citeblock_core::Citation;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Request timeout for a single update or commit call
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Index request failed: {0}")]
    Transport(#[source] Box<ureq::Transport>),

    #[error("Failed to encode citations: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ureq::Error> for IndexError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => IndexError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => IndexError::Transport(Box::new(transport)),
        }
    }
}

/// Outcome of one `index_citations` run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub batches: usize,
    pub failed_batches: usize,
    pub records: usize,
}

/// Record id: the leading characters of the candidate text the citation
/// was parsed from
pub fn document_id(original: &str, prefix_chars: usize) -> String {
    original.chars().take(prefix_chars).collect()
}

pub struct SolrIndexer {
    agent: ureq::Agent,
    url: String,
    batch_size: usize,
    id_prefix_chars: usize,
}

impl SolrIndexer {
    pub fn new(config: &IndexerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build();
        Self {
            agent,
            url: config.url.clone(),
            batch_size: config.batch_size.max(1),
            id_prefix_chars: config.id_prefix_chars,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Assign ids in place and submit in batches, so the caller's records
    /// carry the ids that were indexed. Never fails as a whole; per batch
    /// failures are logged and counted in the report.
    pub fn index_citations(&self, citations: &mut [Citation]) -> IndexReport {
        for citation in citations.iter_mut() {
            citation.id = Some(document_id(&citation.original, self.id_prefix_chars));
        }

        let mut report = IndexReport::default();
        for batch in citations.chunks(self.batch_size) {
            report.batches += 1;
            match self.index_batch(batch) {
                Ok(()) => {
                    report.records += batch.len();
                    debug!(records = batch.len(), "batch indexed");
                }
                Err(err) => {
                    report.failed_batches += 1;
                    error!(url = %self.url, records = batch.len(), "❌ {err}");
                }
            }
        }

        info!(
            batches = report.batches,
            failed = report.failed_batches,
            records = report.records,
            "indexing complete"
        );
        report
    }

    /// Post one batch, then commit. The commit is issued even when the post
    /// failed; the first error is returned.
    pub fn index_batch(&self, batch: &[Citation]) -> Result<(), IndexError> {
        if batch.is_empty() {
            return Ok(());
        }
        let posted = self.post(batch);
        let committed = self.commit();
        posted.and(committed)
    }

    fn post(&self, batch: &[Citation]) -> Result<(), IndexError> {
        let body = serde_json::to_string(batch)?;
        self.agent
            .post(&self.url)
            .set("Content-type", "application/json")
            .send_string(&body)?;
        Ok(())
    }

    pub fn commit(&self) -> Result<(), IndexError> {
        self.agent
            .get(&self.url)
            .query("commit", "true")
            .call()?;
        Ok(())
    }
}
