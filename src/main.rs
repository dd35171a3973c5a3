//! warc-jsonl: WARC archives to JSON lines for annotation

use std::io::{self, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warc_jsonl::{run, Cli, ReadabilityExtractor};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Records go to stdout, everything else to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let extractor = ReadabilityExtractor::new();
    let options = cli.process_options();
    let mut out = BufWriter::new(io::stdout().lock());

    let report = run(&cli.warc, &extractor, &options, &mut out);
    if report.files.len() > 1 {
        info!("all archives: {}", report.totals());
    }

    if report.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
