use crate::config::SelectionConfig;
use crate::rules::ScoreState;
use crate::types::{CandidateRecord, HtmlDocument};
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Citation blocks almost always carry a publication year
static YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"19\d\d|20\d\d").expect("static year regex"));

pub const DEFAULT_MIN_TEXT_LENGTH: usize = 95;

/// Ranks scored elements and keeps the ones that look like citation blocks
#[derive(Debug, Clone)]
pub struct Selector {
    ratio: f64,
    threshold: f64,
    min_text_length: usize,
    year_regex: Regex,
}

impl Selector {
    pub fn new(config: &SelectionConfig) -> Result<Self> {
        let year_regex = Regex::new(&config.year_pattern)
            .with_context(|| format!("Invalid year pattern {:?}", config.year_pattern))?;
        Ok(Self {
            ratio: config.ratio,
            threshold: config.threshold,
            min_text_length: config.min_text_length,
            year_regex,
        })
    }

    /// Selector with the given cutoffs and the default content filters
    pub fn with_cutoffs(ratio: f64, threshold: f64) -> Self {
        Self {
            ratio,
            threshold,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            year_regex: YEAR_REGEX.clone(),
        }
    }

    pub fn select(
        &self,
        document: &HtmlDocument,
        scores: &ScoreState,
        filename: Option<&str>,
    ) -> Vec<CandidateRecord> {
        let mut records = Vec::new();
        let mut highest_score = 0.0_f64;

        for (id, score) in scores.ranked() {
            // The scan is descending, so after the first element this is the
            // global maximum
            highest_score = highest_score.max(score);
            if score < self.threshold {
                continue;
            }
            if score < highest_score * self.ratio {
                continue;
            }

            let text = document.normalized_text(id);
            if text.chars().count() < self.min_text_length {
                trace!(id, score, "dropped: text too short");
                continue;
            }
            if !self.year_regex.is_match(&text) {
                trace!(id, score, "dropped: no year-like token");
                continue;
            }

            records.push(CandidateRecord {
                filename: filename.map(str::to_string),
                citation: text,
                score,
                tag: document.element(id).tag.clone(),
            });
        }

        debug!(
            candidates = records.len(),
            highest_score, "selection complete"
        );
        records
    }
}

/// One-shot selection with the default content filters
pub fn select(
    document: &HtmlDocument,
    scores: &ScoreState,
    ratio: f64,
    threshold: f64,
    filename: Option<&str>,
) -> Vec<CandidateRecord> {
    Selector::with_cutoffs(ratio, threshold).select(document, scores, filename)
}
