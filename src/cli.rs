//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ProcessOptions, DEFAULT_PROGRESS_INTERVAL};

/// Convert WARC web archives into JSON lines of cleaned, HTML-like documents
#[derive(Debug, Parser)]
#[command(name = "warc-jsonl", version, about)]
pub struct Cli {
    /// WARC files to process, gzip-compressed or plain
    #[arg(required = true, value_name = "WARC")]
    pub warc: Vec<PathBuf>,

    /// Require given number of tokens to extract document
    #[arg(short = 'm', long = "min-tokens", value_name = "N")]
    pub min_tokens: Option<usize>,

    /// Log progress and per-archive details
    #[arg(short, long)]
    pub verbose: bool,

    /// Records between progress lines, 0 to disable
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,
}

impl Cli {
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions::default()
            .with_min_tokens(self.min_tokens)
            .with_progress_interval(self.progress_interval)
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}
