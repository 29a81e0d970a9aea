use std::{
    mem,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam::{
    channel::{self, Receiver, RecvTimeoutError, Sender},
    select,
    sync::WaitGroup,
};
use log::{debug, error, info, warn};
use viewtrack_runtime::{DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_INTAKE_CAPACITY};
use viewtrack_store::{Record, Sink};

use crate::{IngestError, RetryPolicy};

/// What `stop` does with retries still running when its deadline passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeadlinePolicy {
    /// Leave them running in the background; they may outlive `stop`.
    #[default]
    Detach,
    /// Interrupt their backoff sleeps and drop the batches.
    CancelRetries,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// A flush is triggered as soon as the buffer holds this many records.
    pub max_batch_size: usize,
    /// Longest time a non-empty buffer waits before being flushed.
    pub flush_interval: Duration,
    /// Bound of the intake channel; `enqueue` blocks when it is full.
    pub intake_capacity: usize,
    pub retry: RetryPolicy,
    pub deadline_policy: DeadlinePolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            retry: RetryPolicy::default(),
            deadline_policy: DeadlinePolicy::default(),
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_intake_capacity(mut self, capacity: usize) -> Self {
        self.intake_capacity = capacity;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline_policy(mut self, policy: DeadlinePolicy) -> Self {
        self.deadline_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_batch_size == 0 {
            return Err(IngestError::InvalidConfig(
                "max_batch_size must be positive".into(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(IngestError::InvalidConfig(
                "flush_interval must be positive".into(),
            ));
        }
        if self.intake_capacity == 0 {
            return Err(IngestError::InvalidConfig(
                "intake_capacity must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(IngestError::InvalidConfig(
                "retry.max_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Every buffered record was handed off and every flush finished.
    Drained,
    /// The deadline passed while flushes were still running.
    DeadlineElapsed,
    /// An earlier call already stopped the queue.
    AlreadyStopped,
}

/// Writes one batch through the sink under the retry policy.
#[derive(Clone)]
struct Flusher {
    sink: Arc<dyn Sink>,
    retry: RetryPolicy,
    cancelled: Receiver<()>,
}

impl Flusher {
    fn write(&self, records: &[Record]) -> Result<u32, IngestError> {
        self.retry
            .run(&self.cancelled, || self.sink.batch_write(records))
    }

    fn write_one(&self, record: &Record) -> Result<u32, IngestError> {
        self.retry.run(&self.cancelled, || self.sink.write(record))
    }

    /// Background flush: failures are only logged, nobody is waiting on it.
    fn deliver(&self, batch: Vec<Record>) {
        match self.write(&batch) {
            Ok(attempt) => debug!("Flushed {} records (attempt {attempt})", batch.len()),
            Err(e) => error!("Dropping batch of {} records: {e}", batch.len()),
        }
    }
}

/// Owns the buffer. Runs on its own thread until the intake closes.
struct Accumulator {
    intake: Receiver<Record>,
    flusher: Flusher,
    max_batch_size: usize,
    flush_interval: Duration,
    inflight: WaitGroup,
}

impl Accumulator {
    fn run(self) {
        let mut buf = Vec::with_capacity(self.max_batch_size);
        let mut next_flush = Instant::now() + self.flush_interval;

        loop {
            let now = Instant::now();
            if now >= next_flush {
                if !buf.is_empty() {
                    self.dispatch(self.take(&mut buf));
                }
                next_flush = now + self.flush_interval;
            }

            select! {
                recv(self.intake) -> msg => match msg {
                    Ok(record) => {
                        buf.push(record);
                        if buf.len() >= self.max_batch_size {
                            self.dispatch(self.take(&mut buf));
                            next_flush = Instant::now() + self.flush_interval;
                        }
                    }
                    Err(_) => break,
                },
                default(next_flush.saturating_duration_since(now)) => {}
            }
        }

        if !buf.is_empty() {
            self.dispatch(buf);
        }

        debug!("Accumulator exiting");
    }

    fn take(&self, buf: &mut Vec<Record>) -> Vec<Record> {
        mem::replace(buf, Vec::with_capacity(self.max_batch_size))
    }

    /// Hand `batch` to its own flush thread so sink latency never stalls intake.
    fn dispatch(&self, batch: Vec<Record>) {
        let size = batch.len();
        let flusher = self.flusher.clone();
        let guard = self.inflight.clone();

        let spawned = thread::Builder::new()
            .name("viewtrack-flush".into())
            .spawn(move || {
                flusher.deliver(batch);
                drop(guard);
            });

        if let Err(e) = spawned {
            error!("Failed to spawn flush thread, dropping batch of {size} records: {e}");
        }
    }
}

/// Producer-side batching in front of a [`Sink`].
///
/// Records go through a bounded intake channel to a single accumulation
/// thread. A batch is flushed when it reaches `max_batch_size` or when
/// `flush_interval` has passed since the previous flush. Each flush runs on
/// its own thread with retries, so a slow sink never delays accumulation.
pub struct BatchingQueue {
    config: QueueConfig,
    flusher: Flusher,
    stopped: AtomicBool,
    intake: RwLock<Option<Sender<Record>>>,
    inflight: Mutex<Option<WaitGroup>>,
    // Only present under DeadlinePolicy::CancelRetries; dropping it cancels.
    cancel: Mutex<Option<Sender<()>>>,
}

impl BatchingQueue {
    pub fn new(sink: Arc<dyn Sink>, config: QueueConfig) -> Result<Self, IngestError> {
        config.validate()?;

        let (intake_tx, intake_rx) = channel::bounded(config.intake_capacity);

        let (cancel, cancelled) = match config.deadline_policy {
            DeadlinePolicy::Detach => (None, channel::never()),
            DeadlinePolicy::CancelRetries => {
                let (tx, rx) = channel::bounded(0);
                (Some(tx), rx)
            }
        };

        let flusher = Flusher {
            sink,
            retry: config.retry,
            cancelled,
        };

        let inflight = WaitGroup::new();

        let accumulator = Accumulator {
            intake: intake_rx,
            flusher: flusher.clone(),
            max_batch_size: config.max_batch_size,
            flush_interval: config.flush_interval,
            inflight: inflight.clone(),
        };

        thread::Builder::new()
            .name("viewtrack-accumulator".into())
            .spawn(move || accumulator.run())?;

        debug!(
            "Batching queue started: max_batch_size={}, flush_interval={:?}",
            config.max_batch_size, config.flush_interval
        );

        Ok(Self {
            config,
            flusher,
            stopped: AtomicBool::new(false),
            intake: RwLock::new(Some(intake_tx)),
            inflight: Mutex::new(Some(inflight)),
            cancel: Mutex::new(cancel),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add one record to the current batch.
    ///
    /// Blocks only while the intake channel is full.
    pub fn enqueue(&self, record: Record) -> Result<(), IngestError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(IngestError::Stopped);
        }

        let intake = self
            .intake
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(IngestError::Stopped)?;

        intake.send(record).map_err(|_| IngestError::Stopped)
    }

    /// Write `records` straight to the sink, skipping the buffer.
    ///
    /// Runs on the caller's thread with the same retry policy as a flush and
    /// reports exhaustion to the caller.
    pub fn batch_write(&self, records: &[Record]) -> Result<(), IngestError> {
        let _guard = self.direct_guard()?;

        if records.is_empty() {
            return Ok(());
        }

        self.flusher.write(records).map(|_| ())
    }

    /// Write one record straight to the sink through [`Sink::write`].
    ///
    /// Same retry and shutdown rules as [`BatchingQueue::batch_write`].
    pub fn write(&self, record: &Record) -> Result<(), IngestError> {
        let _guard = self.direct_guard()?;
        self.flusher.write_one(record).map(|_| ())
    }

    // Holding a member of the group makes `stop` wait for the direct write.
    fn direct_guard(&self) -> Result<WaitGroup, IngestError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(IngestError::Stopped);
        }

        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(IngestError::Stopped)
    }

    /// Close intake, flush what is buffered and wait for in-flight writes.
    ///
    /// Returns once everything drained or `deadline` elapsed, whichever
    /// comes first. Only the first call does anything.
    pub fn stop(&self, deadline: Duration) -> StopOutcome {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return StopOutcome::AlreadyStopped;
        }

        info!("Stopping batching queue (deadline {deadline:?})");

        // The accumulator sees the channel close once in-progress sends finish.
        drop(
            self.intake
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let Some(inflight) = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return StopOutcome::Drained;
        };

        let (done_tx, done_rx) = channel::bounded(1);
        thread::spawn(move || {
            inflight.wait();
            let _ = done_tx.send(());
        });

        match done_rx.recv_timeout(deadline) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                info!("Batching queue drained");
                StopOutcome::Drained
            }
            Err(RecvTimeoutError::Timeout) => {
                let cancel = self
                    .cancel
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();

                if cancel.is_some() {
                    warn!("Stop deadline elapsed; cancelling in-flight retries");
                } else {
                    warn!("Stop deadline elapsed; in-flight retries continue in the background");
                }

                drop(cancel);
                StopOutcome::DeadlineElapsed
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
