//! Error types for archive reading, extraction and emission

use thiserror::Error;

/// Corrupt container framing. Fatal for the archive being read.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error while reading archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WARC version line at offset {offset}: {line:?}")]
    InvalidVersion { offset: u64, line: String },

    #[error("malformed header line at offset {offset}: {line:?}")]
    InvalidHeader { offset: u64, line: String },

    #[error("stream ended inside the headers of the record at offset {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("record at offset {offset} has no Content-Length header")]
    MissingContentLength { offset: u64 },

    #[error("invalid Content-Length {value:?} in record at offset {offset}")]
    InvalidContentLength { offset: u64, value: String },

    #[error("truncated record at offset {offset}: expected {expected} bytes, got {actual}")]
    Truncated {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("missing record trailer after record at offset {offset}")]
    MissingTrailer { offset: u64 },
}

/// Failure raised by a content extractor for a single payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("could not parse payload: {0}")]
    Parse(String),

    #[error("readability failed: {0}")]
    Readability(String),

    #[error("invalid document XML: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for ExtractionError {
    fn from(e: quick_xml::Error) -> Self {
        ExtractionError::Xml(e.to_string())
    }
}

/// Output record could not be built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("rendered document is empty")]
    EmptyHtml,
}

/// Errors that stop processing of an archive
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    /// Output-side failures leave nowhere to write the remaining files
    pub fn is_fatal_for_job(&self) -> bool {
        !matches!(self, PipelineError::Archive(_))
    }
}
