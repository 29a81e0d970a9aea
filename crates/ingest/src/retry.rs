use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use log::warn;
use viewtrack_runtime::{DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS};

use crate::IngestError;

/// Linear backoff: after failed attempt `n` the next try waits `n * backoff_unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// Backoff sleeps wait on `cancelled`; once its sender is dropped the
    /// loop gives up early. Returns the attempt that succeeded.
    pub(crate) fn run<F>(&self, cancelled: &Receiver<()>, mut op: F) -> Result<u32, IngestError>
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        let mut attempt = 1;

        loop {
            let err = match op() {
                Ok(()) => return Ok(attempt),
                Err(err) => err,
            };

            warn!(
                "Batch write failed (attempt {attempt}/{}): {err:#}",
                self.max_attempts
            );

            if attempt >= self.max_attempts {
                return Err(IngestError::SinkUnavailable {
                    attempts: attempt,
                    source: err,
                });
            }

            match cancelled.recv_timeout(self.backoff(attempt)) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(IngestError::SinkUnavailable {
                        attempts: attempt,
                        source: err.context("retries cancelled at shutdown deadline"),
                    });
                }
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
