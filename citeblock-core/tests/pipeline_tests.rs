//! Pipeline tests: fixture page + fixture rule set through the public API.
//!
//! Fixtures live in `test_fixtures/`:
//!
//! - `pages/publications.html`: a personal homepage with a publications list
//!   (three entries linking to PDFs) and a teaching list
//! - `rules/publications.json`: a heading that opens a forward zone, list
//!   items that collect it, and PDF links that push score up to their item
//!
//! No network or external reference parser is needed to run these tests.

use citeblock_core::{
    CandidateRecord, CitationExtractor, ExtractionConfig, HtmlDocument, HtmlPreprocessor,
    Preprocessor, RuleSet, RuleSetError, ScoreState, ScoringEngine, Selector,
};
use std::path::PathBuf;

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

fn load_rules(name: &str) -> RuleSet {
    let path = fixtures_dir().join("rules").join(name);
    RuleSet::load_from_file(&path)
        .unwrap_or_else(|e| panic!("Invalid fixture {}: {e}", path.display()))
}

fn load_page(name: &str) -> Vec<u8> {
    let path = fixtures_dir().join("pages").join(name);
    std::fs::read(&path).unwrap_or_else(|_| panic!("Missing fixture: {}", path.display()))
}

fn score_page(rules: &RuleSet, page: &str) -> (HtmlDocument, ScoreState) {
    let document = HtmlPreprocessor::new()
        .process(&load_page(page))
        .expect("fixture page should parse");
    let scores = ScoringEngine::new(rules).score(&document);
    (document, scores)
}

fn extractor(ratio: f64, threshold: f64) -> CitationExtractor {
    let mut config = ExtractionConfig::default();
    config.selection.ratio = ratio;
    config.selection.threshold = threshold;
    CitationExtractor::new(load_rules("publications.json"), &config)
        .expect("default selection config is valid")
}

/// Score of every element with the given tag, in document order
fn scores_of(document: &HtmlDocument, scores: &ScoreState, tag: &str) -> Vec<f64> {
    document
        .iter()
        .filter(|(_, e)| e.tag == tag)
        .map(|(id, _)| scores.score(id))
        .collect()
}

// ============================================================================
// Scoring: the publications page under the publications rules
// ============================================================================

mod scoring {
    use super::*;

    #[test]
    fn publication_items_collect_forward_and_upward_score() {
        let rules = load_rules("publications.json");
        let (document, scores) = score_page(&rules, "publications.html");

        // 50 from the forward zone + 100 pushed up by the PDF link
        assert_eq!(scores_of(&document, &scores, "li"), vec![150.0, 150.0, 150.0, 0.0]);
    }

    #[test]
    fn list_gets_weighted_share_of_zone_and_links() {
        let rules = load_rules("publications.json");
        let (document, scores) = score_page(&rules, "publications.html");

        let lists = scores_of(&document, &scores, "ul");
        assert_eq!(lists.len(), 2);
        // 0.2 * 50 forward + 3 links * 0.2 * 100
        assert!((lists[0] - 70.0).abs() < 1e-9, "got {}", lists[0]);
        // the teaching heading closed the zone
        assert_eq!(lists[1], 0.0);
    }

    #[test]
    fn uppercase_pdf_extension_still_matches() {
        let rules = load_rules("publications.json");
        let (document, scores) = score_page(&rules, "publications.html");

        let second_item = document
            .iter()
            .filter(|(_, e)| e.tag == "li")
            .map(|(id, _)| id)
            .nth(1)
            .unwrap();
        assert!(document.normalized_text(second_item).contains("Journal of Web Extraction"));
        assert_eq!(scores.score(second_item), 150.0);
    }

    #[test]
    fn elements_without_rules_stay_at_zero() {
        let rules = load_rules("publications.json");
        let (document, scores) = score_page(&rules, "publications.html");

        for tag in ["html", "head", "title", "body", "p", "i"] {
            assert!(
                scores_of(&document, &scores, tag).iter().all(|s| *s == 0.0),
                "<{tag}> should not be scored"
            );
        }
    }
}

// ============================================================================
// Extraction: preprocess -> score -> select
// ============================================================================

mod extraction {
    use super::*;

    fn extract(ratio: f64, threshold: f64) -> Vec<CandidateRecord> {
        extractor(ratio, threshold)
            .extract(&load_page("publications.html"), Some("publications.html"))
            .expect("extraction should succeed")
    }

    #[test]
    fn selects_the_three_publications() {
        let records = extract(0.5, 100.0);
        assert_eq!(records.len(), 3);

        assert!(records[0].citation.starts_with("J. Doe and R. Roe. Scoring document trees"));
        assert!(records[1].citation.contains("2011"));
        assert!(records[2].citation.contains("TR-2014-07"));
        for record in &records {
            assert_eq!(record.tag, "li");
            assert_eq!(record.filename.as_deref(), Some("publications.html"));
            // whitespace normalized
            assert!(!record.citation.contains("  "));
            assert!(!record.citation.contains('\n'));
        }
    }

    #[test]
    fn list_container_is_dropped_by_threshold() {
        let records = extract(0.0, 100.0);
        assert!(records.iter().all(|r| r.tag == "li"));
    }

    #[test]
    fn low_threshold_admits_the_list_container() {
        // the ul's text is long and carries years, so only the cutoffs keep it out
        let records = extract(0.0, 50.0);
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].tag, "ul");
    }

    #[test]
    fn ratio_excludes_the_list_container() {
        let records = extract(0.5, 50.0);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn threshold_above_best_score_selects_nothing() {
        assert!(extract(0.0, 151.0).is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let extractor = extractor(0.5, 100.0);
        let page = load_page("publications.html");
        let first = extractor.extract(&page, None).unwrap();
        let second = extractor.extract(&page, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn extract_file_uses_path_as_filename() {
        let path = fixtures_dir().join("pages").join("publications.html");
        let records = extractor(0.5, 100.0).extract_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0]
            .filename
            .as_deref()
            .is_some_and(|f| f.ends_with("publications.html")));
    }

    #[test]
    fn selector_over_engine_output_matches_extractor() {
        let rules = load_rules("publications.json");
        let (document, scores) = score_page(&rules, "publications.html");
        let direct = Selector::with_cutoffs(0.5, 100.0).select(&document, &scores, None);
        let via_extractor = extractor(0.5, 100.0)
            .extract(&load_page("publications.html"), None)
            .unwrap();
        assert_eq!(direct, via_extractor);
    }
}

// ============================================================================
// Errors: rule set problems surface at load time
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn missing_rule_file_is_io_error() {
        let err = RuleSet::load_from_file("/nonexistent/rules.json").unwrap_err();
        assert!(matches!(err, RuleSetError::Io { .. }));
    }

    #[test]
    fn missing_score_names_tag_and_index() {
        let err = RuleSet::from_json_str(
            r#"{"li": [{"score": 1, "importance": 1}, {"importance": 1}]}"#,
        )
        .unwrap_err();
        match err {
            RuleSetError::Malformed { tag, index, .. } => {
                assert_eq!(tag, "li");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rules_that_are_not_a_list_name_the_tag() {
        let err = RuleSet::from_json_str(
            r#"{"h1": [], "li": {"score": 1, "importance": 1}}"#,
        )
        .unwrap_err();
        match &err {
            RuleSetError::NotAList { tag, found } => {
                assert_eq!(tag, "li");
                assert_eq!(*found, "an object");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("<li>"));
    }

    #[test]
    fn top_level_must_be_an_object() {
        let err = RuleSet::from_json_str(r#"[{"score": 1}]"#).unwrap_err();
        assert!(matches!(err, RuleSetError::Json(_)));
    }

    #[test]
    fn unknown_pattern_kind_is_rejected() {
        let err = RuleSet::from_json_str(
            r#"{"a": [{"patterns": {"css": "x"}, "score": 1, "importance": 0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleSetError::Malformed { .. }));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = RuleSet::from_json_str(
            r#"{"h1": [{"patterns": {"text": "(unclosed"}, "score": 1, "importance": 0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleSetError::InvalidRegex { .. }));
        assert!(err.to_string().contains("h1"));
    }

    #[test]
    fn empty_page_is_an_error() {
        assert!(extractor(0.0, 100.0).extract(b"", None).is_err());
    }

    #[test]
    fn page_without_matches_is_empty_not_error() {
        let records = extractor(0.0, 100.0)
            .extract(b"<html><body><p>Nothing to see here.</p></body></html>", None)
            .unwrap();
        assert!(records.is_empty());
    }
}

// ============================================================================
// Stage capture
// ============================================================================

mod stages {
    use super::*;

    #[test]
    fn stages_are_consistent() {
        let stages = extractor(0.5, 100.0)
            .capture_stages(&load_page("publications.html"), Some("publications.html"))
            .unwrap();

        assert!(stages.markup.contains("<h1>Publications</h1>"));
        // three items + the publications list
        assert_eq!(stages.scored.len(), 4);
        assert_eq!(stages.scored[0].score, 150.0);
        assert_eq!(stages.candidates.len(), 3);
        assert!(stages.element_count > stages.scored.len());

        let json = serde_json::to_value(&stages).unwrap();
        assert_eq!(json["candidates"].as_array().map(Vec::len), Some(3));
    }
}
