// All extraction logic is in citeblock-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod inputs;
pub mod solr;
pub mod summary;

// Re-export core types for convenience
pub use citeblock_core::*;

// Re-export CLI utilities
pub use inputs::{collect_inputs, InputSource};
pub use solr::{IndexError, IndexReport, SolrIndexer};
pub use summary::RunSummary;
