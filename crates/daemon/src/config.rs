use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::{Parser, ValueEnum};
use viewtrack_ingest::{DeadlinePolicy, QueueConfig};
use viewtrack_runtime::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WORKERS,
    default_data_path, default_socket_path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Keep views in process memory; lost on exit.
    Memory,
    /// Append views to an NDJSON log on disk.
    File,
}

impl StoreKind {
    pub fn name(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::File => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    // Unix domain socket path
    pub socket_path: PathBuf,
    pub store: StoreKind,
    // NDJSON log, only used by the file store
    pub data_path: PathBuf,
    pub queue: QueueConfig,
    pub workers: usize,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Parser)]
#[command(name = "viewtrack-daemon", about = "Viewtrack ingestion daemon")]
pub struct Cli {
    /// Path to Unix domain socket (optional override)
    #[arg(long)]
    pub socket_path: Option<PathBuf>,

    /// Where tracked views are persisted
    #[arg(long, value_enum, default_value_t = StoreKind::File)]
    pub store: StoreKind,

    /// Path to the NDJSON view log (optional override)
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Flush as soon as this many views are buffered
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Flush buffered views at least this often
    #[arg(long, default_value_t = DEFAULT_FLUSH_INTERVAL.as_millis() as u64)]
    pub flush_interval_ms: u64,

    /// Number of workers writing pre-formed batches
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// How long shutdown waits for pending flushes
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT.as_secs())]
    pub shutdown_timeout_secs: u64,

    /// Abandon flush retries still running when the shutdown timeout hits
    #[arg(long)]
    pub cancel_retries_on_deadline: bool,
}

impl DaemonConfig {
    pub fn from_args(args: &Cli) -> Result<Self> {
        ensure!(args.workers > 0, "--workers must be positive");

        let deadline_policy = if args.cancel_retries_on_deadline {
            DeadlinePolicy::CancelRetries
        } else {
            DeadlinePolicy::Detach
        };

        let queue = QueueConfig::new()
            .with_max_batch_size(args.batch_size)
            .with_flush_interval(Duration::from_millis(args.flush_interval_ms))
            .with_deadline_policy(deadline_policy);
        queue.validate()?;

        Ok(Self {
            socket_path: args.socket_path.clone().unwrap_or_else(default_socket_path),
            store: args.store,
            data_path: args.data_path.clone().unwrap_or_else(default_data_path),
            queue,
            workers: args.workers,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }

    pub fn from_env() -> Result<Self> {
        let args = Cli::parse();
        Self::from_args(&args)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
