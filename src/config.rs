//! Processing options

/// Records between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Minimum token count for a document to be written; `None` disables the gate
    pub min_tokens: Option<usize>,
    /// Log progress every this many records; 0 disables progress lines
    pub progress_interval: u64,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            min_tokens: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ProcessOptions {
    pub fn with_min_tokens(mut self, min_tokens: Option<usize>) -> Self {
        self.min_tokens = min_tokens;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}
