//! Benchmark run configuration.

use crate::error::{Error, Result};

/// Default number of rows inserted per scenario repetition.
pub const DEFAULT_ROW_COUNT: u64 = 10_000;

/// Default number of measured repetitions per scenario.
pub const DEFAULT_REPETITIONS: u32 = 1;

/// Benchmark run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Rows inserted by each repetition.
    pub row_count: u64,

    /// Measured repetitions per scenario.
    pub repetitions: u32,

    /// Untimed repetitions per scenario run before measuring.
    pub warmup: u32,

    /// Backends to benchmark, in report order. Empty means every registered backend.
    pub backend_ids: Vec<String>,

    /// Check table contents after every repetition.
    pub verify: bool,
}

impl BenchConfig {
    pub fn new() -> Self {
        Self {
            row_count: DEFAULT_ROW_COUNT,
            repetitions: DEFAULT_REPETITIONS,
            warmup: 0,
            backend_ids: Vec::new(),
            verify: false,
        }
    }

    /// Set the number of rows per repetition.
    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = row_count;
        self
    }

    /// Set the number of measured repetitions.
    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Set the number of warmup repetitions.
    pub fn with_warmup(mut self, warmup: u32) -> Self {
        self.warmup = warmup;
        self
    }

    /// Restrict the run to the given backends.
    pub fn with_backends<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable post-run verification.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Reject configurations that cannot produce a measurement.
    pub fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(Error::InvalidConfig(
                "repetitions must be at least 1".to_string(),
            ));
        }
        if self.backend_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(Error::InvalidConfig("backend id cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new()
    }
}
