//! Per-archive run counters

use std::fmt;

/// What happened to a single archive record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Not a response record
    Skipped,
    /// Response with no usable content
    Empty,
    /// Extractor raised an error
    Failed,
    /// Below the token threshold
    Filtered,
    /// Written to the output
    Emitted,
}

/// Counters for one processing run. `total` counts every record read,
/// `responses` every response record among them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: u64,
    pub responses: u64,
    pub empties: u64,
    pub errors: u64,
    pub filtered: u64,
    pub emitted: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one record
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.total += 1;
        match outcome {
            RecordOutcome::Skipped => return,
            RecordOutcome::Empty => self.empties += 1,
            RecordOutcome::Failed => self.errors += 1,
            RecordOutcome::Filtered => self.filtered += 1,
            RecordOutcome::Emitted => self.emitted += 1,
        }
        self.responses += 1;
    }

    /// Fold counters from another run into this one
    pub fn merge(&mut self, other: &RunStats) {
        self.total += other.total;
        self.responses += other.responses;
        self.empties += other.empties;
        self.errors += other.errors;
        self.filtered += other.filtered;
        self.emitted += other.emitted;
    }

    /// True every `interval` records; an interval of 0 never fires
    pub fn at_progress_mark(&self, interval: u64) -> bool {
        interval > 0 && self.total > 0 && self.total % interval == 0
    }

    /// Final summary, with the filtered and emitted counts appended
    pub fn summary(&self) -> String {
        format!(
            "Done, {}, {} filtered, {} written",
            self, self.filtered, self.emitted
        )
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {} records, {} responses, {} empty, {} errors",
            self.total, self.responses, self.empties, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut stats = RunStats::new();
        stats.record(RecordOutcome::Skipped);
        assert_eq!((stats.total, stats.responses), (1, 0));

        stats.record(RecordOutcome::Empty);
        stats.record(RecordOutcome::Failed);
        stats.record(RecordOutcome::Filtered);
        stats.record(RecordOutcome::Emitted);

        assert_eq!(
            stats,
            RunStats {
                total: 5,
                responses: 4,
                empties: 1,
                errors: 1,
                filtered: 1,
                emitted: 1,
            }
        );
    }

    #[test]
    fn test_display() {
        let stats = RunStats {
            total: 3,
            responses: 2,
            empties: 1,
            errors: 0,
            filtered: 0,
            emitted: 1,
        };
        assert_eq!(
            stats.to_string(),
            "processed 3 records, 2 responses, 1 empty, 0 errors"
        );
        assert_eq!(
            stats.summary(),
            "Done, processed 3 records, 2 responses, 1 empty, 0 errors, 0 filtered, 1 written"
        );
    }

    #[test]
    fn test_progress_mark() {
        let mut stats = RunStats::new();
        assert!(!stats.at_progress_mark(1000));
        stats.total = 1000;
        assert!(stats.at_progress_mark(1000));
        assert!(!stats.at_progress_mark(0));
        stats.total = 1001;
        assert!(!stats.at_progress_mark(1000));
    }

    #[test]
    fn test_merge() {
        let mut job = RunStats::new();
        let mut file = RunStats::new();
        file.record(RecordOutcome::Emitted);
        job.merge(&file);
        job.merge(&file);
        assert_eq!(job.total, 2);
        assert_eq!(job.emitted, 2);
    }
}
