//! WARC to JSON lines converter
//!
//! Reads web-archive captures and turns each HTTP response into one JSON
//! record for annotation:
//! - WARC record framing, gzip members and HTTP payload decoding
//! - Pluggable content extraction into a structured document tree
//! - Tag remapping from the extractor vocabulary to HTML
//! - Token-count filtering, record assembly and per-run counters

pub mod cli;
pub mod config;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod http;
pub mod pipeline;
pub mod record;
pub mod remap;
pub mod stats;
pub mod tree;
pub mod warc;

pub use cli::Cli;
pub use config::ProcessOptions;
pub use error::{ArchiveError, ExtractionError, PipelineError, RecordError};
pub use extractors::{ContentExtractor, ReadabilityExtractor};
pub use filter::{count_tokens, passes_filter};
pub use pipeline::{process_file, run, JobReport, Pipeline, Processed};
pub use record::{assemble, OutputRecord};
pub use remap::{remap, remap_to_html, TagMapping};
pub use stats::{RecordOutcome, RunStats};
pub use tree::{Content, DocumentTree, Node};
pub use warc::{open_archive, ArchiveReader, RecordType, WarcRecord};
