use super::ruleset::{CompiledRule, RuleSet};
use crate::types::*;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

// Debug configuration for score tracing
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub filter_patterns: Vec<String>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        Self {
            enabled,
            filter_patterns,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            filter_patterns: Vec::new(),
        }
    }
}

/// Trace every scored element whose text matches one of the debug filters
pub fn debug_scored_elements(
    document: &HtmlDocument,
    state: &ScoreState,
    debug_config: &DebugConfig,
) {
    if !debug_config.enabled || debug_config.filter_patterns.is_empty() {
        return;
    }

    // Try regex first, fall back to simple string contains
    let filters: Vec<(Option<Regex>, &str)> = debug_config
        .filter_patterns
        .iter()
        .map(|pattern| (Regex::new(pattern).ok(), pattern.as_str()))
        .collect();

    for (id, score) in state.iter() {
        if score == 0.0 {
            continue;
        }
        let text = document.normalized_text(id);
        let hit = filters.iter().any(|(regex, raw)| match regex {
            Some(regex) => regex.is_match(&text),
            None => text.contains(raw),
        });
        if !hit {
            continue;
        }
        let preview: String = text.chars().take(60).collect();
        info!(
            id,
            tag = %document.element(id).tag,
            score,
            importance = state.importance(id),
            "🔍 {preview}"
        );
    }
}

/// Per-element accumulators, indexed by `ElementId`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreState {
    scores: Vec<f64>,
    importance: Vec<f64>,
}

impl ScoreState {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: Vec::with_capacity(capacity),
            importance: Vec::with_capacity(capacity),
        }
    }

    /// Build a state from final scores, importance left at zero
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let importance = vec![0.0; scores.len()];
        Self { scores, importance }
    }

    /// Register the next element in traversal order with zeroed accumulators
    fn visit(&mut self, id: ElementId) {
        debug_assert_eq!(id, self.scores.len(), "elements must be visited in order");
        self.scores.push(0.0);
        self.importance.push(0.0);
    }

    pub fn score(&self, id: ElementId) -> f64 {
        self.scores.get(id).copied().unwrap_or(0.0)
    }

    pub fn importance(&self, id: ElementId) -> f64 {
        self.importance.get(id).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// (id, score) pairs in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, f64)> + '_ {
        self.scores.iter().copied().enumerate()
    }

    /// Every element with a non-zero score, highest first, ties in
    /// traversal order
    pub fn ranked(&self) -> Vec<(ElementId, f64)> {
        let mut ranked: Vec<(ElementId, f64)> =
            self.iter().filter(|(_, score)| *score != 0.0).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn scored_elements(
        &self,
        document: &HtmlDocument,
        filename: Option<&str>,
    ) -> Vec<ScoredElement> {
        self.ranked()
            .into_iter()
            .map(|(id, score)| ScoredElement {
                id,
                tag: document.element(id).tag.clone(),
                score,
                importance: self.importance(id),
                text: document.normalized_text(id),
                filename: filename.map(str::to_string),
            })
            .collect()
    }
}

/// Running document-order bonus and the bookkeeping needed to cancel it
#[derive(Debug, Clone, Default)]
pub struct ForwardState {
    forward_score: f64,
    /// activating tag -> amount it currently contributes
    activated: HashMap<String, f64>,
    /// boundary tag -> activating tags it cancels
    boundaries: HashMap<String, BTreeSet<String>>,
}

impl ForwardState {
    pub fn forward_score(&self) -> f64 {
        self.forward_score
    }

    pub fn is_active(&self, tag: &str) -> bool {
        self.activated.contains_key(tag)
    }

    /// Remove, in full, every active contribution that `tag` is a boundary for
    fn cancel_at(&mut self, tag: &str) {
        let Some(starters) = self.boundaries.get(tag) else {
            return;
        };
        for start_tag in starters {
            if let Some(amount) = self.activated.remove(start_tag) {
                self.forward_score -= amount;
                debug!(boundary = tag, activator = %start_tag, amount, "forward contribution cancelled");
            }
        }
        // No float residue once nothing is active
        if self.activated.is_empty() {
            self.forward_score = 0.0;
        }
    }

    fn activate(&mut self, tag: &str, amount: f64, stop_at: &[String]) {
        *self.activated.entry(tag.to_string()).or_insert(0.0) += amount;
        self.forward_score += amount;
        for stop_tag in stop_at {
            self.boundaries
                .entry(stop_tag.clone())
                .or_default()
                .insert(tag.to_string());
        }
    }
}

/// All mutable state of one document traversal
#[derive(Debug, Clone, Default)]
pub struct ScoreContext {
    pub scores: ScoreState,
    pub forward: ForwardState,
}

impl ScoreContext {
    pub fn for_document(document: &HtmlDocument) -> Self {
        Self {
            scores: ScoreState::with_capacity(document.len()),
            forward: ForwardState::default(),
        }
    }
}

/// Scores every element of a document against a rule set.
///
/// The engine itself holds no per-document state: each call to `score`
/// builds a fresh `ScoreContext`, so one engine can be reused across
/// documents (and shared across threads, one document per thread).
pub struct ScoringEngine<'r> {
    rules: &'r RuleSet,
    debug_config: DebugConfig,
}

impl<'r> ScoringEngine<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            debug_config: DebugConfig::disabled(),
        }
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    pub fn score(&self, document: &HtmlDocument) -> ScoreState {
        let mut context = ScoreContext::for_document(document);
        self.score_with_context(document, &mut context);
        context.scores
    }

    /// Traverse in document order. Ids are pre-order indices, so counting up
    /// visits parents before children and earlier text before later text.
    pub fn score_with_context(&self, document: &HtmlDocument, context: &mut ScoreContext) {
        for id in 0..document.len() {
            self.visit(document, id, context);
        }

        debug!(
            elements = document.len(),
            scored = context.scores.iter().filter(|(_, s)| *s != 0.0).count(),
            "document scored"
        );
        debug_scored_elements(document, &context.scores, &self.debug_config);
    }

    fn visit(&self, document: &HtmlDocument, id: ElementId, context: &mut ScoreContext) {
        context.scores.visit(id);
        let tag = document.element(id).tag.as_str();

        // Matching is pure, evaluate once and reuse for the forward pass
        let matched: Vec<&CompiledRule> = self
            .rules
            .rules_for(tag)
            .iter()
            .filter(|rule| rule.matches(document, id))
            .collect();

        for rule in &matched {
            context.scores.scores[id] += rule.score;
            context.scores.importance[id] += rule.importance;
            if let Some(up) = rule.contribute_up {
                propagate_up(document, id, up, &mut context.scores);
            }
        }

        let bonus = context.scores.importance[id] * context.forward.forward_score();
        context.scores.scores[id] += bonus;

        // Boundaries are checked before new activations so an element that
        // both closes and opens a zone starts from the cancelled value
        context.forward.cancel_at(tag);

        for rule in &matched {
            if let Some(amount) = rule.contribute_forward {
                context.forward.activate(tag, amount, &rule.stop_at);
            }
        }
    }
}

/// Push `amount` to every ancestor, each weighted by its own importance.
/// The amount itself is not attenuated with distance.
fn propagate_up(document: &HtmlDocument, id: ElementId, amount: f64, scores: &mut ScoreState) {
    for ancestor in document.ancestors(id) {
        scores.scores[ancestor] += scores.importance[ancestor] * amount;
    }
}
