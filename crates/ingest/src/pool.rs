use std::{
    any::Any,
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam::{
    channel::{self, Receiver, Sender},
    select,
};
use log::{debug, error, info};

use crate::IngestError;

/// Unit of work run by a [`WorkerPool`]. It owns everything it needs,
/// including any acknowledgement of the message that produced it.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed number of threads pulling jobs from one dispatch point.
///
/// The dispatch point has no buffer: [`WorkerPool::queue`] returns only once
/// a worker has taken the job, which is what bounds concurrency and pushes
/// back on submitters.
pub struct WorkerPool {
    bus_tx: Mutex<Option<Sender<Job>>>,
    bus_rx: Receiver<Job>,
    // Nothing is ever sent; dropping the sender is the stop broadcast.
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    pub fn new() -> Self {
        let (bus_tx, bus_rx) = channel::bounded(0);
        let (stop_tx, stop_rx) = channel::bounded(0);

        Self {
            bus_tx: Mutex::new(Some(bus_tx)),
            bus_rx,
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
            workers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Spawn `workers` long-lived worker threads.
    pub fn start(&self, workers: usize) -> Result<(), IngestError> {
        if workers == 0 {
            return Err(IngestError::InvalidConfig(
                "worker count must be positive".into(),
            ));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(IngestError::Stopped);
        }

        let mut handles = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if !handles.is_empty() {
            return Err(IngestError::AlreadyStarted);
        }

        for worker_id in 0..workers {
            let bus = self.bus_rx.clone();
            let stop = self.stop_rx.clone();

            let handle = thread::Builder::new()
                .name(format!("viewtrack-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, bus, stop))?;

            handles.push(handle);
        }

        info!("Worker pool started with {workers} workers");
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Hand `job` to a free worker, blocking until one takes it.
    ///
    /// Once the pool is stopped the job is dropped without running.
    pub fn queue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(bus) = self
            .bus_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            debug!("Worker pool stopped; discarding job");
            return;
        };

        let job: Job = Box::new(job);

        select! {
            send(bus, job) -> res => {
                if res.is_err() {
                    debug!("Dispatch closed; discarding job");
                }
            },
            recv(self.stop_rx) -> _ => debug!("Worker pool stopped; discarding job"),
        }
    }

    /// Stop accepting jobs and wait for every accepted job to finish.
    pub fn stop(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        drop(
            self.stop_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        drop(
            self.bus_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let handles = mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        let count = handles.len();

        for handle in handles {
            if handle.join().is_err() {
                error!("Worker thread panicked outside of a job");
            }
        }

        info!("Worker pool stopped ({count} workers joined)");
    }
}

fn worker_loop(worker_id: usize, bus: Receiver<Job>, stop: Receiver<()>) {
    loop {
        select! {
            recv(bus) -> job => match job {
                Ok(job) => run_job(worker_id, job),
                Err(_) => return,
            },
            recv(stop) -> _ => return,
        }
    }
}

fn run_job(worker_id: usize, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(
            "Job failed on worker {worker_id}: panicked with {}",
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
