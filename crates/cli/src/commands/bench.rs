use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;
use crossbeam::channel;
use log::warn;
use viewtrack_protocol::{DaemonRequest, TrackRequest};

use crate::client::{Client, require_id};
use crate::commands::CommandResult;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Args)]
pub struct BenchArgs {
    /// Number of concurrent request loops
    #[arg(short = 'w', long, default_value_t = 1)]
    pub workers: usize,

    /// Identifier to track on every request
    #[arg(short = 'i', long, default_value = "1")]
    pub id: String,

    /// How long to run before reporting totals
    #[arg(long, default_value_t = 10)]
    pub duration_secs: u64,
}

pub fn run(client: &Client, args: BenchArgs) -> CommandResult<()> {
    require_id(&args.id)?;
    anyhow::ensure!(args.workers > 0, "--workers must be positive");

    println!("using {} worker(s) for {}s", args.workers, args.duration_secs);

    let stop = AtomicBool::new(false);
    let window = AtomicU64::new(0);
    let total = AtomicU64::new(0);
    let errors = AtomicU64::new(0);

    let started = Instant::now();
    let deadline = channel::after(Duration::from_secs(args.duration_secs));
    let ticker = channel::tick(REPORT_INTERVAL);

    thread::scope(|s| {
        for _ in 0..args.workers {
            s.spawn(|| {
                while !stop.load(Ordering::Relaxed) {
                    let request = DaemonRequest::Track(TrackRequest::now(args.id.as_str()));
                    match client.submit(&request) {
                        Ok(()) => {
                            window.fetch_add(1, Ordering::Relaxed);
                            total.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            errors.fetch_add(1, Ordering::Relaxed);
                            warn!("Request failed: {e:#}");
                        }
                    }
                }
            });
        }

        loop {
            crossbeam::select! {
                recv(ticker) -> _ => {
                    println!("Requests per second: {}", window.swap(0, Ordering::Relaxed));
                }
                recv(deadline) -> _ => break,
            }
        }
        stop.store(true, Ordering::Relaxed);
    });

    let elapsed = started.elapsed().as_secs_f64();
    let total = total.load(Ordering::Relaxed);
    println!(
        "{total} requests in {elapsed:.1}s ({:.0}/s), {} errors",
        total as f64 / elapsed.max(f64::EPSILON),
        errors.load(Ordering::Relaxed),
    );
    Ok(())
}
