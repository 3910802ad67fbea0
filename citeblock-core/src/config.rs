use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

// Default value functions for serde
fn default_threshold() -> f64 {
    100.0
}

fn default_min_text_length() -> usize {
    crate::selector::DEFAULT_MIN_TEXT_LENGTH
}

fn default_year_pattern() -> String {
    r"19\d\d|20\d\d".to_string()
}

fn default_parser_command() -> String {
    "../ParsCit/bin/parseRefStrings.pl".to_string()
}

fn default_parser_args() -> Vec<String> {
    vec!["-".to_string()]
}

fn default_index_url() -> String {
    "http://localhost:8983/solr/citations/update".to_string()
}

fn default_batch_size() -> usize {
    10 // keeps each update request small
}

fn default_id_prefix_chars() -> usize {
    100
}

/// Settings for one extraction run. Every field has a default, so a YAML
/// file only needs the values it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub reference_parser: ReferenceParserConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Relative cutoff against the best score (0.0-1.0, 0 disables it)
    #[serde(default)]
    pub ratio: f64,
    /// Absolute score cutoff
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Minimum normalized text length in characters
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    /// Regex that must occur in a candidate's text (a publication year)
    #[serde(default = "default_year_pattern")]
    pub year_pattern: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            ratio: 0.0,
            threshold: default_threshold(),
            min_text_length: default_min_text_length(),
            year_pattern: default_year_pattern(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceParserConfig {
    /// Executable that reads reference strings on stdin and writes XML
    #[serde(default = "default_parser_command")]
    pub command: String,
    #[serde(default = "default_parser_args")]
    pub args: Vec<String>,
}

impl Default for ReferenceParserConfig {
    fn default() -> Self {
        Self {
            command: default_parser_command(),
            args: default_parser_args(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// JSON update endpoint; commits go to the same URL with `commit=true`
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Record ids are this many leading characters of the original text
    #[serde(default = "default_id_prefix_chars")]
    pub id_prefix_chars: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            batch_size: default_batch_size(),
            id_prefix_chars: default_id_prefix_chars(),
        }
    }
}

impl ExtractionConfig {
    /// Load config from file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {path}"))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid config {path}"))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ExtractionConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load config with fallback to default, reporting which one was used
    pub fn load_with_fallback(path: Option<&str>) -> (Self, ConfigOrigin) {
        let Some(p) = path else {
            return (Self::default(), ConfigOrigin::Defaults);
        };
        match Self::load_from_file(p) {
            Ok(config) => (config, ConfigOrigin::File(p.to_string())),
            Err(err) => {
                warn!("⚠️  Failed to load config from {p}, using defaults: {err:#}");
                (Self::default(), ConfigOrigin::Defaults)
            }
        }
    }
}

/// Where the active config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(String),
    Defaults,
}
