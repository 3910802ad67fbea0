// Rule system: loading, matching and score propagation
// - ruleset.rs: JSON rule definitions compiled into CompiledRule
// - pattern.rs: attribute/text pattern matching
// - engine.rs: ScoringEngine, the document-order traversal

pub mod engine;
pub mod pattern;
pub mod ruleset;

pub use engine::{DebugConfig, ForwardState, ScoreContext, ScoreState, ScoringEngine};
pub use ruleset::{CompiledRule, Pattern, PatternSpec, RuleDefinition, RuleSet};
