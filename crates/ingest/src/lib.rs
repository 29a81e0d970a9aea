//! Batched ingestion of view records.
//!
//! [`BatchingQueue`] sits on the producer side: it turns single records into
//! bounded batches flushed on a size-or-interval trigger, with linear-backoff
//! retries running off the accumulation path. [`WorkerPool`] sits on the
//! consumer side and bounds how many batch jobs run at once.

mod error;
mod pool;
mod queue;
mod retry;

pub use error::IngestError;
pub use pool::{Job, WorkerPool};
pub use queue::{BatchingQueue, DeadlinePolicy, QueueConfig, StopOutcome};
pub use retry::RetryPolicy;
