use super::ruleset::{CompiledRule, Pattern};
use crate::types::{ElementId, HtmlDocument};

/// Does the element satisfy every pattern of the rule?
///
/// Attribute patterns need the attribute to be present; text patterns need
/// non-empty aggregated text. Both use unanchored, case-insensitive search.
pub fn matches(document: &HtmlDocument, id: ElementId, rule: &CompiledRule) -> bool {
    rule.patterns
        .iter()
        .all(|pattern| pattern_matches(document, id, pattern))
}

fn pattern_matches(document: &HtmlDocument, id: ElementId, pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Attr { name, regex } => document
            .element(id)
            .attribute(name)
            .is_some_and(|value| regex.is_match(value)),
        Pattern::Text { regex } => {
            let text = document.text_content(id);
            !text.is_empty() && regex.is_match(text)
        }
    }
}

impl CompiledRule {
    pub fn matches(&self, document: &HtmlDocument, id: ElementId) -> bool {
        matches(document, id, self)
    }
}
