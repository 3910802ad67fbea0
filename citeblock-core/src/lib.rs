// Citeblock Core Library
//
// Scores every element of an HTML document against a declarative rule set
// and selects the elements that look like citation blocks.

pub mod config;
pub mod error;
pub mod output;
pub mod preprocessors;
pub mod processor;
pub mod references;
pub mod rules;
pub mod selector;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{ConfigOrigin, ExtractionConfig};
pub use error::RuleSetError;
pub use output::OutputFormat;
pub use preprocessors::{HtmlPreprocessor, Preprocessor};
pub use processor::{CitationExtractor, ExtractionStages, StepProfiler};
pub use references::{ParsCitParser, ReferenceParser};
pub use rules::{DebugConfig, RuleSet, ScoreState, ScoringEngine};
pub use selector::{select, Selector};
pub use types::*;
