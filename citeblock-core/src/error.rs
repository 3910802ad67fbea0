use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors raised while loading a rule set. All of them are
/// reported before any document is scored.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Failed to read rule set {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule set is not a JSON object of tag -> rule list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rules for <{tag}> must be a list, found {found}")]
    NotAList { tag: String, found: &'static str },

    #[error("Malformed rule #{index} for <{tag}>: {source}")]
    Malformed {
        tag: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {kind} regex {pattern:?} in rule #{index} for <{tag}>: {source}")]
    InvalidRegex {
        tag: String,
        index: usize,
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Rule #{index} for <{tag}> has negative importance {importance}")]
    InvalidImportance {
        tag: String,
        index: usize,
        importance: f64,
    },
}
