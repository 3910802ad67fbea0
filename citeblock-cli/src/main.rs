use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// Import from citeblock-core
use citeblock_core::output::{self, TextLine};
use citeblock_core::{
    CitationExtractor, ConfigOrigin, DebugConfig, ExtractionConfig, ExtractionStages,
    OutputFormat, RuleSet, StepProfiler,
};

// Import CLI utilities
use citeblock::{collect_inputs, InputSource, RunSummary, SolrIndexer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Print selected citation blocks
    Extract,
    /// Print every scored element with its score (rule tuning)
    Scores,
    /// Run the reference parser on selected blocks
    Parse,
    /// Parse and submit citations to the search index
    Index,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Extract => "extract",
            Mode::Scores => "scores",
            Mode::Parse => "parse",
            Mode::Index => "index",
        }
    }
}

#[derive(Parser)]
#[command(name = "citeblock")]
#[command(about = "Extract citation blocks from HTML pages with declarative scoring rules")]
struct Args {
    /// HTML files or directories (walked recursively); stdin when omitted
    inputs: Vec<PathBuf>,

    /// Rules JSON file
    #[arg(short = 'R', long)]
    rules: String,

    /// Keep elements scoring at least this fraction of the best score [0.0 - 1.0]
    #[arg(short, long)]
    ratio: Option<f64>,

    /// Keep elements scoring at least this much
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// What to do with each document
    #[arg(short, long, value_enum, default_value = "extract")]
    mode: Mode,

    /// Output format: json, jsonl, or text
    #[arg(short = 'f', long, default_value = "json")]
    output_format: String,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<String>,

    /// Trace scored elements whose text matches this pattern (repeatable)
    #[arg(long = "debug-filter")]
    debug_filters: Vec<String>,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,

    /// Override the index update URL
    #[arg(long)]
    solr_url: Option<String>,

    /// Override the reference parser command
    #[arg(long)]
    parscit: Option<String>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    summary: Option<String>,

    /// Dump intermediate pipeline stages of every document to this directory
    #[arg(long)]
    dump_stages: Option<String>,
}

fn init_logging(level: &str, verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    // stderr only: stdout carries the results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Everything one run produces, kept per kind so each can be rendered
#[derive(Default)]
struct RunOutput {
    records: Vec<citeblock_core::CandidateRecord>,
    scored: Vec<citeblock_core::ScoredElement>,
    citations: Vec<citeblock_core::Citation>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.verbose)?;

    info!("🦀 Citeblock citation block extractor");

    let format: OutputFormat = args.output_format.parse()?;
    let config = load_config(&args);

    // Rule set problems are fatal before any document is touched
    let rules = RuleSet::load_from_file(&args.rules)
        .with_context(|| format!("Failed to load rules from {}", args.rules))?;
    if rules.is_empty() {
        warn!("⚠️  Rule set {} is empty, nothing will be scored", args.rules);
    }

    let mut extractor = CitationExtractor::new(rules, &config)?;
    if !args.debug_filters.is_empty() {
        extractor.set_debug_config(DebugConfig::new(true, args.debug_filters.clone()));
    }

    let sources = collect_inputs(&args.inputs, extractor.preprocessor());
    info!(documents = sources.len(), mode = args.mode.as_str(), "📄 Processing");

    let mut summary = RunSummary::start(&args.rules, args.mode.as_str());
    let mut run = RunOutput::default();
    let mut profiler = StepProfiler::new(args.profile);

    for (position, source) in sources.iter().enumerate() {
        summary.documents += 1;
        if let Err(e) = process_source(&extractor, source, position, &args, &mut profiler, &mut run)
        {
            summary.failed_documents += 1;
            error!(document = %source, "❌ Processing failed: {e:#}");
        }
    }
    profiler.log_summary();

    summary.candidates = run.records.len();
    summary.scored_elements = run.scored.len();
    summary.citations = run.citations.len();

    if args.mode == Mode::Index {
        let indexer = SolrIndexer::new(&config.indexer);
        info!(url = indexer.url(), citations = run.citations.len(), "📤 Indexing");
        summary.index = Some(indexer.index_citations(&mut run.citations));
    }

    match args.mode {
        Mode::Extract => write_results(&run.records, format, args.output.as_deref())?,
        Mode::Scores => write_results(&run.scored, format, args.output.as_deref())?,
        Mode::Parse | Mode::Index => write_results(&run.citations, format, args.output.as_deref())?,
    }

    summary.finish();
    if let Some(path) = &args.summary {
        summary.save(path)?;
        info!("💾 Summary saved to: {}", path);
    }

    info!(
        documents = summary.documents,
        failed = summary.failed_documents,
        candidates = summary.candidates,
        citations = summary.citations,
        "✅ Done"
    );

    if summary.all_failed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Config file (or defaults) with command line overrides applied
fn load_config(args: &Args) -> ExtractionConfig {
    let (mut config, origin) = ExtractionConfig::load_with_fallback(args.config.as_deref());

    match origin {
        ConfigOrigin::File(path) => info!("📋 Loaded config from: {}", path),
        ConfigOrigin::Defaults => info!("📋 Using default config"),
    }

    // Apply CLI overrides to config
    if let Some(ratio) = args.ratio {
        config.selection.ratio = ratio;
    }
    if let Some(threshold) = args.threshold {
        config.selection.threshold = threshold;
    }
    if let Some(url) = &args.solr_url {
        config.indexer.url = url.clone();
    }
    if let Some(command) = &args.parscit {
        config.reference_parser.command = command.clone();
    }
    config
}

fn process_source(
    extractor: &CitationExtractor,
    source: &InputSource,
    position: usize,
    args: &Args,
    profiler: &mut StepProfiler,
    run: &mut RunOutput,
) -> Result<()> {
    let bytes = source.read()?;
    let filename = source.filename();

    if let Some(dir) = &args.dump_stages {
        let stages = extractor.capture_stages(&bytes, filename.as_deref())?;
        save_stages(&stages, dir, source, position)?;
    }

    match args.mode {
        Mode::Scores => {
            let scored =
                extractor.scored_elements_with_profiler(&bytes, filename.as_deref(), profiler)?;
            run.scored.extend(scored);
        }
        Mode::Extract => {
            let records = extractor.extract_with_profiler(&bytes, filename.as_deref(), profiler)?;
            run.records.extend(records);
        }
        Mode::Parse | Mode::Index => {
            let records = extractor.extract_with_profiler(&bytes, filename.as_deref(), profiler)?;
            let citations =
                profiler.time_step("5. Reference Parsing", || extractor.parse_references(&records));
            run.records.extend(records);
            run.citations.extend(citations);
        }
    }
    Ok(())
}

fn write_results<T: Serialize + TextLine>(
    items: &[T],
    format: OutputFormat,
    output_path: Option<&str>,
) -> Result<()> {
    match output_path {
        Some(path) => {
            output::save_with_format(items, path, format)?;
            info!("💾 {} results saved to: {}", items.len(), path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            output::write_items(items, format, &mut handle)?;
            handle.flush()?;
        }
    }
    Ok(())
}

fn save_stages(
    stages: &ExtractionStages,
    output_dir: &str,
    source: &InputSource,
    position: usize,
) -> Result<()> {
    use std::fs;

    let dir = PathBuf::from(output_dir).join(source.stage_dir_name(position));
    fs::create_dir_all(&dir)?;

    // Stage 1: Decoded markup
    let markup_path = dir.join("stage1_markup.html");
    fs::write(&markup_path, &stages.markup)?;
    info!("  💾 {}", markup_path.display());

    // Stage 2: Scored elements
    let scored_path = dir.join("stage2_scored.json");
    fs::write(&scored_path, serde_json::to_string_pretty(&stages.scored)?)?;
    info!("  💾 {} ({} elements)", scored_path.display(), stages.scored.len());

    // Stage 3: Candidates
    let candidates_path = dir.join("stage3_candidates.json");
    fs::write(&candidates_path, serde_json::to_string_pretty(&stages.candidates)?)?;
    info!(
        "  💾 {} ({} candidates)",
        candidates_path.display(),
        stages.candidates.len()
    );

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "document": source.to_string(),
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "markup_bytes": stages.markup.len(),
            "elements": stages.element_count,
            "scored_elements": stages.scored.len(),
            "candidates": stages.candidates.len(),
        }
    });
    let summary_path = dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    info!("  💾 {}", summary_path.display());

    Ok(())
}
