//! The rule set and config shipped at the workspace root must stay loadable.

use citeblock::{ExtractionConfig, RuleSet};
use std::path::PathBuf;

fn workspace_file(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join(relative)
}

#[test]
fn homepage_rules_load() {
    let rules = RuleSet::load_from_file(workspace_file("rules/homepage.json")).unwrap();
    assert!(rules.has_rules("li"));
    assert!(rules.has_rules("a"));
    assert_eq!(rules.rules_for("a").len(), 2);
}

#[test]
fn default_config_matches_built_in_defaults() {
    let path = workspace_file("configs/default.yaml");
    let config = ExtractionConfig::load_from_file(path.to_str().unwrap()).unwrap();
    let defaults = ExtractionConfig::default();

    assert_eq!(config.selection.ratio, defaults.selection.ratio);
    assert_eq!(config.selection.threshold, defaults.selection.threshold);
    assert_eq!(config.selection.min_text_length, defaults.selection.min_text_length);
    assert_eq!(config.selection.year_pattern, defaults.selection.year_pattern);
    assert_eq!(config.reference_parser.command, defaults.reference_parser.command);
    assert_eq!(config.indexer.url, defaults.indexer.url);
    assert_eq!(config.indexer.batch_size, defaults.indexer.batch_size);
}
