//! Archive-to-JSONL pipeline
//!
//! Pulls records from an [`ArchiveReader`] one at a time, runs each response
//! through extraction, remapping, filtering and assembly, and writes the
//! surviving records as JSON lines in archive order. Per-record failures are
//! counted and logged; only archive framing and output errors stop a run.

use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::ProcessOptions;
use crate::error::{ExtractionError, PipelineError};
use crate::extractors::ContentExtractor;
use crate::filter::passes_filter;
use crate::http::is_markup;
use crate::record::{assemble, OutputRecord};
use crate::remap::remap_to_html;
use crate::stats::{RecordOutcome, RunStats};
use crate::warc::{open_archive, ArchiveReader, WarcRecord};

/// Result of running one record through the stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    NotResponse,
    Empty,
    Failed(ExtractionError),
    Filtered,
    Emitted(OutputRecord),
}

impl Processed {
    pub fn outcome(&self) -> RecordOutcome {
        match self {
            Processed::NotResponse => RecordOutcome::Skipped,
            Processed::Empty => RecordOutcome::Empty,
            Processed::Failed(_) => RecordOutcome::Failed,
            Processed::Filtered => RecordOutcome::Filtered,
            Processed::Emitted(_) => RecordOutcome::Emitted,
        }
    }
}

pub struct Pipeline<'a, E: ?Sized> {
    extractor: &'a E,
    options: &'a ProcessOptions,
}

impl<'a, E: ContentExtractor + ?Sized> Pipeline<'a, E> {
    pub fn new(extractor: &'a E, options: &'a ProcessOptions) -> Self {
        Self { extractor, options }
    }

    /// Drain `reader`, writing one JSON line per emitted record to `out`.
    /// Counters accumulate into `stats`, which stays valid if an error ends the run.
    pub fn process<R: BufRead, W: Write>(
        &self,
        reader: ArchiveReader<R>,
        out: &mut W,
        stats: &mut RunStats,
    ) -> Result<(), PipelineError> {
        for record in reader {
            let record = record?;
            let processed = self.process_record(&record);
            stats.record(processed.outcome());

            if let Processed::Emitted(output) = processed {
                serde_json::to_writer(&mut *out, &output)?;
                out.write_all(b"\n").map_err(PipelineError::Output)?;
            }

            if stats.at_progress_mark(self.options.progress_interval) {
                info!("{}", stats);
            }
        }

        out.flush().map_err(PipelineError::Output)?;
        Ok(())
    }

    /// Run a single record through extraction, filtering and assembly
    pub fn process_record(&self, record: &WarcRecord) -> Processed {
        if !record.is_response() {
            return Processed::NotResponse;
        }

        let id = record.record_id().unwrap_or_default();
        let uri = record.target_uri().unwrap_or_default();
        if id.is_empty() || uri.is_empty() {
            warn!(
                offset = record.offset,
                "response record without WARC-Record-ID or WARC-Target-URI"
            );
        }

        let payload = record.payload();
        if payload.is_empty() {
            debug!(record_id = id, "empty payload");
            return Processed::Empty;
        }

        let media_type = record.payload_media_type();
        if !is_markup(media_type.as_deref(), &payload) {
            debug!(
                record_id = id,
                media_type = media_type.as_deref().unwrap_or("unknown"),
                "not an HTML payload"
            );
            return Processed::Empty;
        }

        let tree = match guarded(|| self.extractor.extract_structured(&payload)) {
            Ok(Some(tree)) => tree,
            Ok(None) => {
                debug!(record_id = id, "nothing extracted");
                return Processed::Empty;
            }
            Err(e) => {
                error!("failed extract for {}: {}", id, e);
                return Processed::Failed(e);
            }
        };

        // A root with no content renders to nothing worth annotating
        if tree.root().is_empty() {
            return Processed::Empty;
        }

        if let Some(min_tokens) = self.options.min_tokens {
            let text = match guarded(|| self.extractor.extract_text(&payload)) {
                Ok(text) => text.unwrap_or_default(),
                Err(e) => {
                    error!("failed text extract for {}: {}", id, e);
                    return Processed::Failed(e);
                }
            };
            if !passes_filter(&text, Some(min_tokens)) {
                debug!(record_id = id, min_tokens, "below token threshold");
                return Processed::Filtered;
            }
        }

        let attributes = tree.root_attributes().to_vec();
        let html = remap_to_html(tree);

        match assemble(uri, html, id, &attributes) {
            Ok(output) => Processed::Emitted(output),
            Err(e) => {
                debug!(record_id = id, "{}", e);
                Processed::Empty
            }
        }
    }
}

/// Contain extractor panics to the record that caused them
fn guarded<T>(
    extract: impl FnOnce() -> Result<T, ExtractionError>,
) -> Result<T, ExtractionError> {
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(result) => result,
        Err(cause) => {
            let reason = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "extractor panicked".to_string());
            Err(ExtractionError::Parse(reason))
        }
    }
}

/// Open one archive file and run it through the pipeline
pub fn process_file<E, W>(
    path: &Path,
    extractor: &E,
    options: &ProcessOptions,
    out: &mut W,
    stats: &mut RunStats,
) -> Result<(), PipelineError>
where
    E: ContentExtractor + ?Sized,
    W: Write,
{
    let reader = open_archive(path)?;
    info!(path = %path.display(), "processing archive");
    Pipeline::new(extractor, options).process(reader, out, stats)
}

/// Outcome of a job over several archive files
#[derive(Debug, Default)]
pub struct JobReport {
    /// Counters per archive, in the order the archives were started
    pub files: Vec<RunStats>,
    /// Any archive failed to open, hit a framing error, or the output broke
    pub failed: bool,
}

impl JobReport {
    pub fn totals(&self) -> RunStats {
        let mut totals = RunStats::new();
        for stats in &self.files {
            totals.merge(stats);
        }
        totals
    }
}

/// Process archives one after another with fresh counters for each.
/// A broken archive moves on to the next path, an output failure ends the job.
/// The summary line of every archive goes to stderr.
pub fn run<P, E, W>(
    paths: &[P],
    extractor: &E,
    options: &ProcessOptions,
    out: &mut W,
) -> JobReport
where
    P: AsRef<Path>,
    E: ContentExtractor + ?Sized,
    W: Write,
{
    let mut report = JobReport::default();

    for path in paths {
        let path = path.as_ref();
        let mut stats = RunStats::new();
        let result = process_file(path, extractor, options, out, &mut stats);
        eprintln!("{}", stats.summary());
        report.files.push(stats);

        if let Err(e) = result {
            error!(path = %path.display(), "{}", e);
            report.failed = true;
            if e.is_fatal_for_job() {
                break;
            }
        }
    }

    report
}
