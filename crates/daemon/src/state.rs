use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use anyhow::Context;
use log::{info, warn};
use viewtrack_ingest::{BatchingQueue, StopOutcome, WorkerPool};
use viewtrack_store::{FileStore, MemoryStore, Retriever, Sink};

use crate::config::{DaemonConfig, StoreKind};

pub struct DaemonState {
    pub config: DaemonConfig,
    pub queue: Arc<BatchingQueue>,
    pub pool: WorkerPool,
    pub retriever: Arc<dyn Retriever>,
    views_accepted: AtomicU64,
    batches_accepted: AtomicU64,
}

impl DaemonState {
    pub fn new(config: DaemonConfig) -> anyhow::Result<Self> {
        let (sink, retriever) = open_store(&config)?;

        let queue = BatchingQueue::new(sink, config.queue.clone())
            .context("Failed to start batching queue")?;

        let pool = WorkerPool::new();
        pool.start(config.workers)
            .context("Failed to start worker pool")?;

        Ok(Self {
            config,
            queue: Arc::new(queue),
            pool,
            retriever,
            views_accepted: AtomicU64::new(0),
            batches_accepted: AtomicU64::new(0),
        })
    }

    pub fn record_views(&self, count: usize) {
        self.views_accepted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status_line(&self) -> String {
        format!(
            "store={}, batch_size={}, flush_interval={:?}, workers={}, views_accepted={}, batches_accepted={}",
            self.config.store.name(),
            self.config.queue.max_batch_size,
            self.config.queue.flush_interval,
            self.pool.worker_count(),
            self.views_accepted.load(Ordering::Relaxed),
            self.batches_accepted.load(Ordering::Relaxed),
        )
    }

    /// Drain workers first: their jobs still write through the queue.
    pub fn shutdown(&self) -> StopOutcome {
        self.pool.stop();

        let outcome = self.queue.stop(self.config.shutdown_timeout);
        match outcome {
            StopOutcome::Drained => info!("All pending views flushed"),
            StopOutcome::DeadlineElapsed => warn!(
                "Shutdown timeout of {:?} elapsed with flushes still pending",
                self.config.shutdown_timeout
            ),
            StopOutcome::AlreadyStopped => {}
        }
        outcome
    }
}

fn open_store(config: &DaemonConfig) -> anyhow::Result<(Arc<dyn Sink>, Arc<dyn Retriever>)> {
    match config.store {
        StoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            let sink: Arc<dyn Sink> = store.clone();
            let retriever: Arc<dyn Retriever> = store;
            Ok((sink, retriever))
        }
        StoreKind::File => {
            let store = FileStore::open(config.data_path.clone()).with_context(|| {
                format!("Failed to open view log at {}", config.data_path.display())
            })?;
            info!("Persisting views to {}", store.path().display());

            let store = Arc::new(store);
            let sink: Arc<dyn Sink> = store.clone();
            let retriever: Arc<dyn Retriever> = store;
            Ok((sink, retriever))
        }
    }
}
