pub mod bench;
pub mod count;
pub mod status;
pub mod track;

use std::process::ExitCode;

use clap::Subcommand;
pub use bench::BenchArgs;
pub use count::CountArgs;
pub use track::{BatchArgs, TrackArgs};

/// Common error type for command handlers
pub type CommandResult<T> = anyhow::Result<T>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record one view of an identifier.
    ///
    /// Example:
    ///   viewtrack track article-42
    ///   viewtrack track --direct article-42
    Track(TrackArgs),

    /// Record several views as one pre-formed batch.
    ///
    /// Example:
    ///   viewtrack batch article-42 article-42 video-7
    Batch(BatchArgs),

    /// Show how many views an identifier received per look-back range.
    ///
    /// Example:
    ///   viewtrack count article-42
    ///   viewtrack count article-42 --range 1h --range 1d --json
    Count(CountArgs),

    /// Show the daemon's configuration and counters.
    Status,

    /// Check that the daemon is reachable.
    Ping,

    /// Flood the daemon with track requests and report throughput.
    Bench(BenchArgs),
}

/// Map a handler result to the process exit code.
pub fn finish(result: CommandResult<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}
