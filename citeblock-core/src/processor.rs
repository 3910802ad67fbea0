use crate::config::ExtractionConfig;
use crate::preprocessors::{HtmlPreprocessor, Preprocessor};
use crate::references::{parse_records, ParsCitParser, ReferenceParser};
use crate::rules::{DebugConfig, RuleSet, ScoringEngine};
use crate::selector::Selector;
use crate::types::*;
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics: lets you inspect each boundary
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractionStages {
    pub markup: String,
    pub element_count: usize,
    pub scored: Vec<ScoredElement>,
    pub candidates: Vec<CandidateRecord>,
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        debug!("⏱️  {}: {}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("   {:.<35} {}ms", "Total", total.as_millis());
    }
}

/// Preprocess → score → select, plus optional reference parsing of the
/// selected candidates
pub struct CitationExtractor {
    preprocessor: Box<dyn Preprocessor>,
    reference_parser: Box<dyn ReferenceParser>,
    rules: RuleSet,
    selector: Selector,
    debug_config: DebugConfig,
}

impl CitationExtractor {
    /// Create CitationExtractor with full dependency injection
    pub fn new_with_dependencies(
        preprocessor: Box<dyn Preprocessor>,
        reference_parser: Box<dyn ReferenceParser>,
        rules: RuleSet,
        selector: Selector,
    ) -> Self {
        Self {
            preprocessor,
            reference_parser,
            rules,
            selector,
            debug_config: DebugConfig::disabled(),
        }
    }

    /// HTML preprocessor and ParsCit, both configured from `config`
    pub fn new(rules: RuleSet, config: &ExtractionConfig) -> Result<Self> {
        let selector = Selector::new(&config.selection)?;
        Ok(Self::new_with_dependencies(
            Box::new(HtmlPreprocessor::new()),
            Box::new(ParsCitParser::from_config(&config.reference_parser)),
            rules,
            selector,
        ))
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    pub fn preprocessor(&self) -> &dyn Preprocessor {
        self.preprocessor.as_ref()
    }

    fn engine(&self) -> ScoringEngine<'_> {
        let mut engine = ScoringEngine::new(&self.rules);
        engine.set_debug_config(self.debug_config.clone());
        engine
    }

    /// Candidate citation blocks of one document
    pub fn extract(&self, bytes: &[u8], filename: Option<&str>) -> Result<Vec<CandidateRecord>> {
        self.extract_with_profiling(bytes, filename, false)
    }

    pub fn extract_with_profiling(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        enable_profiling: bool,
    ) -> Result<Vec<CandidateRecord>> {
        let mut profiler = StepProfiler::new(enable_profiling);
        let records = self.extract_with_profiler(bytes, filename, &mut profiler)?;
        profiler.log_summary();
        Ok(records)
    }

    /// Same as `extract`, timing each stage into a caller-owned profiler
    pub fn extract_with_profiler(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        profiler: &mut StepProfiler,
    ) -> Result<Vec<CandidateRecord>> {
        let start_time = Instant::now();

        let markup = profiler.time_step("1. Bytes → Markup", || {
            self.preprocessor.decode_to_markup(bytes)
        })?;
        let document = profiler.time_step("2. Markup → Elements", || {
            self.preprocessor.parse_markup(&markup)
        })?;
        Ok(self.score_and_select(&document, filename, profiler, start_time))
    }

    fn score_and_select(
        &self,
        document: &HtmlDocument,
        filename: Option<&str>,
        profiler: &mut StepProfiler,
        start_time: Instant,
    ) -> Vec<CandidateRecord> {
        let scores = profiler.time_step("3. Scoring", || self.engine().score(document));
        let records = profiler.time_step("4. Selection", || {
            self.selector.select(document, &scores, filename)
        });

        if records.is_empty() {
            info!(filename = filename.unwrap_or("-"), "no citation blocks found");
        } else {
            info!(
                filename = filename.unwrap_or("-"),
                candidates = records.len(),
                "📄 citation blocks selected in {}ms",
                start_time.elapsed().as_millis()
            );
        }
        records
    }

    /// Read and extract one file; records carry the path as filename
    pub fn extract_file(&self, path: &Path) -> Result<Vec<CandidateRecord>> {
        let start_time = Instant::now();
        let document = self.preprocessor.process_file(path)?;
        let filename = path.display().to_string();
        let mut profiler = StepProfiler::new(false);
        Ok(self.score_and_select(&document, Some(&filename), &mut profiler, start_time))
    }

    /// Every element with a non-zero score, best first
    pub fn scored_elements(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
    ) -> Result<Vec<ScoredElement>> {
        let mut profiler = StepProfiler::new(false);
        self.scored_elements_with_profiler(bytes, filename, &mut profiler)
    }

    /// Same as `scored_elements`, timing each stage into a caller-owned profiler
    pub fn scored_elements_with_profiler(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        profiler: &mut StepProfiler,
    ) -> Result<Vec<ScoredElement>> {
        let markup = profiler.time_step("1. Bytes → Markup", || {
            self.preprocessor.decode_to_markup(bytes)
        })?;
        let document = profiler.time_step("2. Markup → Elements", || {
            self.preprocessor.parse_markup(&markup)
        })?;
        let scores = profiler.time_step("3. Scoring", || self.engine().score(&document));
        Ok(profiler.time_step("4. Ranking", || scores.scored_elements(&document, filename)))
    }

    /// Hand each candidate to the reference parser. Per-record failures are
    /// logged and skipped.
    pub fn parse_references(&self, records: &[CandidateRecord]) -> Vec<Citation> {
        if records.is_empty() {
            return Vec::new();
        }
        let citations = parse_records(self.reference_parser.as_ref(), records);
        debug!(
            parser = self.reference_parser.name(),
            records = records.len(),
            citations = citations.len(),
            "references parsed"
        );
        citations
    }

    /// Extract and parse in one go
    pub fn extract_citations(&self, bytes: &[u8], filename: Option<&str>) -> Result<Vec<Citation>> {
        let records = self.extract(bytes, filename)?;
        Ok(self.parse_references(&records))
    }

    /// Process document and capture all intermediate stage outputs
    pub fn capture_stages(&self, bytes: &[u8], filename: Option<&str>) -> Result<ExtractionStages> {
        let markup = self.preprocessor.decode_to_markup(bytes)?;
        debug!("📋 Stage 1: markup captured ({} bytes)", markup.len());

        let document = self.preprocessor.parse_markup(&markup)?;
        debug!("📋 Stage 2: {} elements captured", document.len());

        let scores = self.engine().score(&document);
        let scored = scores.scored_elements(&document, filename);
        debug!("📋 Stage 3: {} scored elements captured", scored.len());

        let candidates = self.selector.select(&document, &scores, filename);
        debug!("📋 Stage 4: {} candidates captured", candidates.len());

        Ok(ExtractionStages {
            markup,
            element_count: document.len(),
            scored,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    const RULES: &str = r#"{
        "h2": [{"patterns": {"text": "publications"}, "score": 0, "importance": 0,
                "contribute-forward": 100, "stop-at": ["h2"]}],
        "li": [{"score": 0, "importance": 1}]
    }"#;

    const PAGE: &str = "<h2>Publications</h2><ul>\
        <li>J. Doe and R. Roe. Scoring document trees with declarative rules. \
        In Proceedings of the Web Conference, pages 1-10, 2009.</li>\
        <li>Short item</li></ul><h2>Contact</h2><ul><li>Office hours are \
        on Tuesday afternoons from two until four, room 2011 of the main building.</li></ul>";

    struct TitleOnly;

    impl ReferenceParser for TitleOnly {
        fn parse(&self, text: &str) -> Result<Vec<Citation>> {
            if text.is_empty() {
                bail!("empty");
            }
            Ok(vec![Citation {
                title: Some(text.split('.').nth(3).unwrap_or("").trim().to_string()),
                ..Citation::default()
            }])
        }

        fn name(&self) -> &str {
            "title-only"
        }
    }

    fn extractor() -> CitationExtractor {
        CitationExtractor::new_with_dependencies(
            Box::new(HtmlPreprocessor::new()),
            Box::new(TitleOnly),
            RuleSet::from_json_str(RULES).unwrap(),
            Selector::with_cutoffs(0.0, 100.0),
        )
    }

    #[test]
    fn test_extract_selects_zone_items() {
        let records = extractor().extract(PAGE.as_bytes(), Some("page.html")).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].citation.starts_with("J. Doe and R. Roe."));
        assert_eq!(records[0].score, 100.0);
        assert_eq!(records[0].filename.as_deref(), Some("page.html"));
    }

    #[test]
    fn test_profiled_extraction_matches_plain() {
        let extractor = extractor();
        let mut profiler = StepProfiler::new(true);
        let profiled = extractor
            .extract_with_profiler(PAGE.as_bytes(), None, &mut profiler)
            .unwrap();
        assert_eq!(profiled, extractor.extract(PAGE.as_bytes(), None).unwrap());
        assert_eq!(profiler.timings().len(), 4);
    }

    #[test]
    fn test_profiled_scores_match_plain() {
        let extractor = extractor();
        let mut profiler = StepProfiler::new(true);
        let profiled = extractor
            .scored_elements_with_profiler(PAGE.as_bytes(), Some("page.html"), &mut profiler)
            .unwrap();
        assert_eq!(
            profiled,
            extractor.scored_elements(PAGE.as_bytes(), Some("page.html")).unwrap()
        );
        assert_eq!(profiled.len(), 2);
        let steps: Vec<&str> = profiler.timings().iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            steps,
            vec!["1. Bytes → Markup", "2. Markup → Elements", "3. Scoring", "4. Ranking"]
        );
    }

    #[test]
    fn test_extract_file_reads_through_preprocessor() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("test_fixtures/pages/publications.html");
        let bytes = std::fs::read(&path).unwrap();
        let filename = path.display().to_string();

        let extractor = extractor();
        let from_file = extractor.extract_file(&path).unwrap();
        assert_eq!(from_file, extractor.extract(&bytes, Some(&filename)).unwrap());
        assert!(from_file
            .iter()
            .all(|r| r.filename.as_deref() == Some(filename.as_str())));
    }

    #[test]
    fn test_extract_file_missing_path_names_it() {
        let err = extractor()
            .extract_file(Path::new("/nonexistent/page.html"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read /nonexistent/page.html"));
    }

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let mut profiler = StepProfiler::new(false);
        assert_eq!(profiler.time_step("noop", || 7), 7);
        assert!(profiler.timings().is_empty());
    }

    #[test]
    fn test_capture_stages() {
        let stages = extractor().capture_stages(PAGE.as_bytes(), None).unwrap();
        assert!(stages.markup.contains("<h2>Publications</h2>"));
        assert!(stages.element_count > 8);
        // both items in the publications zone are scored, the short one is
        // dropped by selection
        assert_eq!(stages.scored.len(), 2);
        assert_eq!(stages.candidates.len(), 1);
    }

    #[test]
    fn test_extract_citations_attaches_original() {
        let citations = extractor()
            .extract_citations(PAGE.as_bytes(), Some("page.html"))
            .unwrap();
        assert_eq!(citations.len(), 1);
        assert_eq!(
            citations[0].title.as_deref(),
            Some("Scoring document trees with declarative rules")
        );
        assert!(citations[0].original.starts_with("J. Doe"));
        assert_eq!(citations[0].filename.as_deref(), Some("page.html"));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(extractor().extract(b"", None).is_err());
    }
}
