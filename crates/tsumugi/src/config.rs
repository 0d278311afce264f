use std::time::Duration;

/// Default target vocabulary size per language side.
pub const DEFAULT_VOCAB_SIZE: usize = 32_000;

/// Default timeout for connecting and for each read of a download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

const MIN_FETCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`Pipeline`](crate::Pipeline) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Target subword vocabulary size, reserved tokens included.
    pub vocab_size: usize,
    pub fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vocab_size: DEFAULT_VOCAB_SIZE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }

    /// Set the download timeout. Values under one second are raised to one
    /// second.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout.max(MIN_FETCH_TIMEOUT);
        self
    }
}
