//! Rule set loading and compilation.
//!
//! The on-disk format is a JSON object mapping a tag name to an ordered list
//! of rules:
//!
//! ```json
//! {
//!   "a":  [{ "patterns": { "attr": { "href": "\\.pdf$" } },
//!            "score": 0, "importance": 0, "contribute-up": 100 }],
//!   "h2": [{ "patterns": { "text": "publications" },
//!            "score": 0, "importance": 0,
//!            "contribute-forward": 50, "stop-at": ["h1", "h2"] }],
//!   "li": [{ "score": 0, "importance": 1 }]
//! }
//! ```
//!
//! Regexes are compiled once here, case-insensitively. Tag names (keys and
//! `stop-at` entries) and attribute names are lower-cased so they line up
//! with what the HTML parser produces.

use crate::error::RuleSetError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Pattern block of a rule, as written in the rule file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    /// attribute name -> regex searched in the attribute value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<BTreeMap<String, String>>,
    /// regex searched in the element's aggregated text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One rule exactly as written in the rule file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<PatternSpec>,
    pub score: f64,
    pub importance: f64,
    #[serde(
        rename = "contribute-up",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub contribute_up: Option<f64>,
    #[serde(
        rename = "contribute-forward",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub contribute_forward: Option<f64>,
    #[serde(rename = "stop-at", default, skip_serializing_if = "Vec::is_empty")]
    pub stop_at: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Attr { name: String, regex: Regex },
    Text { regex: Regex },
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// All patterns must match; an empty list matches every element
    pub patterns: Vec<Pattern>,
    pub score: f64,
    pub importance: f64,
    pub contribute_up: Option<f64>,
    pub contribute_forward: Option<f64>,
    pub stop_at: Vec<String>,
}

impl CompiledRule {
    fn compile(tag: &str, index: usize, def: RuleDefinition) -> Result<Self, RuleSetError> {
        if def.importance < 0.0 {
            return Err(RuleSetError::InvalidImportance {
                tag: tag.to_string(),
                index,
                importance: def.importance,
            });
        }

        let mut patterns = Vec::new();
        if let Some(spec) = def.patterns {
            for (name, pattern) in spec.attr.unwrap_or_default() {
                let regex = compile_regex(tag, index, "attr", &pattern)?;
                patterns.push(Pattern::Attr {
                    name: name.to_ascii_lowercase(),
                    regex,
                });
            }
            if let Some(pattern) = spec.text {
                let regex = compile_regex(tag, index, "text", &pattern)?;
                patterns.push(Pattern::Text { regex });
            }
        }

        Ok(Self {
            patterns,
            score: def.score,
            importance: def.importance,
            contribute_up: def.contribute_up,
            contribute_forward: def.contribute_forward,
            stop_at: def
                .stop_at
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
        })
    }
}

fn compile_regex(
    tag: &str,
    index: usize,
    kind: &'static str,
    pattern: &str,
) -> Result<Regex, RuleSetError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleSetError::InvalidRegex {
            tag: tag.to_string(),
            index,
            kind,
            pattern: pattern.to_string(),
            source,
        })
}

/// Compiled, immutable rule set keyed by lower-case tag name
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Vec<CompiledRule>>,
}

impl RuleSet {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            tags = rules.rules.len(),
            rules = rules.rule_count(),
            "loaded rule set"
        );
        Ok(rules)
    }

    /// Parse and compile a rule file. Each rule is decoded on its own so a
    /// bad rule is reported with its tag and position.
    pub fn from_json_str(json: &str) -> Result<Self, RuleSetError> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut definitions = BTreeMap::new();
        for (tag, value) in raw {
            let values = match value {
                serde_json::Value::Array(values) => values,
                other => {
                    return Err(RuleSetError::NotAList {
                        tag,
                        found: json_kind(&other),
                    })
                }
            };
            let mut rules = Vec::with_capacity(values.len());
            for (index, value) in values.into_iter().enumerate() {
                let def: RuleDefinition =
                    serde_json::from_value(value).map_err(|source| RuleSetError::Malformed {
                        tag: tag.clone(),
                        index,
                        source,
                    })?;
                rules.push(def);
            }
            definitions.insert(tag, rules);
        }

        Self::from_definitions(definitions)
    }

    pub fn from_definitions(
        definitions: BTreeMap<String, Vec<RuleDefinition>>,
    ) -> Result<Self, RuleSetError> {
        let mut rules: HashMap<String, Vec<CompiledRule>> = HashMap::new();
        for (tag, defs) in definitions {
            let key = tag.to_ascii_lowercase();
            let compiled = defs
                .into_iter()
                .enumerate()
                .map(|(index, def)| CompiledRule::compile(&tag, index, def))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(tag = %key, rules = compiled.len(), "compiled rules");
            // "LI" and "li" land on the same element, keep both rule lists
            rules.entry(key).or_default().extend(compiled);
        }
        Ok(Self { rules })
    }

    /// Rules for a tag in file order; empty when the tag has none
    pub fn rules_for(&self, tag: &str) -> &[CompiledRule] {
        self.rules.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_rules(&self, tag: &str) -> bool {
        self.rules.contains_key(tag)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
