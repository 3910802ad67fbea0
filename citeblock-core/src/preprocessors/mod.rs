//! Document Preprocessors
//!
//! Converts raw document bytes into the `HtmlDocument` arena the scoring
//! engine walks.
//!
//! ```text
//! raw bytes
//!     ↓
//! [decode]        bytes → markup string
//!     ↓
//! [parse]         markup → HtmlDocument (pre-order arena)
//!     ↓
//! ScoringEngine
//! ```
//!
//! Parsing is delegated to `scraper` (html5ever), which recovers from
//! malformed markup the way browsers do.

pub mod html;
pub mod preprocessor;

pub use html::HtmlPreprocessor;
pub use preprocessor::Preprocessor;
