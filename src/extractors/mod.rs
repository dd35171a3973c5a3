//! Content extraction
//!
//! The pipeline only sees the [`ContentExtractor`] trait. The default
//! implementation combines the readability algorithm for the main content with
//! page metadata from meta tags and JSON-LD.

mod metadata_extractor;
mod readability_extractor;

pub use metadata_extractor::*;
pub use readability_extractor::*;

use crate::error::ExtractionError;
use crate::tree::DocumentTree;

/// Turns raw payload bytes into a structured document
pub trait ContentExtractor {
    /// Structured document tree, `Ok(None)` when nothing usable was found
    fn extract_structured(&self, payload: &[u8]) -> Result<Option<DocumentTree>, ExtractionError>;

    /// Plain-text rendition, used for token counting
    fn extract_text(&self, payload: &[u8]) -> Result<Option<String>, ExtractionError>;
}
