use std::time::Duration;

use crate::error::{ScanError, ScanResult};

/// Scheduling and parallelism knobs of a [`Scanner`](crate::Scanner).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    /// Time between cycle starts. A cycle that overruns delays the next one.
    pub interval: Duration,
    /// Scopes enumerated at once.
    pub scope_concurrency: usize,
    /// Object downloads in flight at once.
    pub fetch_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            scope_concurrency: 4,
            fetch_concurrency: 8,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> ScanResult<()> {
        if self.interval.is_zero() {
            return Err(ScanError::InvalidConfig("interval must be greater than zero".into()));
        }
        if self.scope_concurrency == 0 || self.fetch_concurrency == 0 {
            return Err(ScanError::InvalidConfig("concurrency limits must be at least 1".into()));
        }
        Ok(())
    }
}
