use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Pre-order index of an element inside its `HtmlDocument`.
pub type ElementId = usize;

// ===== DOCUMENT TREE =====
// Arena of elements addressed by pre-order index. Children are owned by
// position in the arena, parents are plain indices, so walking `0..len` is
// document order and walking `parent` links never needs reference counting.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlElement {
    /// Lower-case tag name as produced by the HTML parser
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    /// Byte range of this element's aggregated text inside `HtmlDocument::text`
    pub text_range: Range<usize>,
}

impl HtmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HtmlDocument {
    elements: Vec<HtmlElement>,
    /// Every text node of the document concatenated in document order.
    /// An element's aggregated text is always one contiguous slice of it.
    text: String,
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element and return its id. Callers must push in pre-order
    /// with parents before children; the parent's child list is updated here.
    pub fn push_element(
        &mut self,
        tag: &str,
        attributes: HashMap<String, String>,
        parent: Option<ElementId>,
    ) -> ElementId {
        let id = self.elements.len();
        let start = self.text.len();
        self.elements.push(HtmlElement {
            tag: tag.to_ascii_lowercase(),
            attributes,
            parent,
            children: Vec::new(),
            text_range: start..start,
        });
        if let Some(parent) = parent {
            self.elements[parent].children.push(id);
        }
        id
    }

    /// Append a text node belonging to the most recently opened element.
    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Close an element: its aggregated text ends at the current text length.
    pub fn close_element(&mut self, id: ElementId) {
        let end = self.text.len();
        self.elements[id].text_range.end = end;
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: ElementId) -> &HtmlElement {
        &self.elements[id]
    }

    /// Elements in document order (pre-order, parents before children)
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &HtmlElement)> {
        self.elements.iter().enumerate()
    }

    /// Aggregated text of all descendant text nodes, unnormalized
    pub fn text_content(&self, id: ElementId) -> &str {
        &self.text[self.elements[id].text_range.clone()]
    }

    /// Aggregated text with whitespace runs collapsed to single spaces
    pub fn normalized_text(&self, id: ElementId) -> String {
        normalize_whitespace(self.text_content(id))
    }

    /// Ancestors of `id`, nearest first, ending at the root
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            document: self,
            next: self.elements[id].parent,
        }
    }
}

pub struct Ancestors<'a> {
    document: &'a HtmlDocument,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.document.elements[current].parent;
        Some(current)
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ===== SCORING OUTPUT =====

/// One element with its final score, used for diagnostics dumps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredElement {
    pub id: ElementId,
    pub tag: String,
    pub score: f64,
    pub importance: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Selector output: the normalized text of one qualifying element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub citation: String,
    #[serde(skip)]
    pub score: f64,
    #[serde(skip)]
    pub tag: String,
}

// ===== REFERENCE PARSER OUTPUT =====

/// Structured bibliographic record produced by the external reference parser.
/// Flat on purpose: this is the shape submitted to the search index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Citation {
    /// A parsed reference is only worth keeping with an author or a title
    pub fn has_content(&self) -> bool {
        !self.author.is_empty() || self.title.is_some()
    }
}
