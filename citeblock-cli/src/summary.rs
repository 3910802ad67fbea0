use crate::solr::IndexReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-run counts, written with `--summary`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub rules: String,
    pub mode: String,
    pub documents: usize,
    pub failed_documents: usize,
    pub candidates: usize,
    pub scored_elements: usize,
    pub citations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexReport>,
}

impl RunSummary {
    pub fn start(rules: &str, mode: &str) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            rules: rules.to_string(),
            mode: mode.to_string(),
            documents: 0,
            failed_documents: 0,
            candidates: 0,
            scored_elements: 0,
            citations: 0,
            index: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Every document failed; an empty run is not a failure
    pub fn all_failed(&self) -> bool {
        self.documents > 0 && self.failed_documents == self.documents
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write summary {path}"))
    }
}
