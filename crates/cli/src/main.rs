use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

mod client;
mod commands;
mod printer;

use client::Client;
use commands::{Command, finish};
use viewtrack_runtime::{default_socket_path, logging};

#[derive(Debug, Parser)]
#[command(
    name = "viewtrack",
    version,
    about = "Track and count views through the viewtrack daemon",
    propagate_version = true
)]
pub struct Cli {
    /// Path to the daemon's Unix domain socket
    #[arg(long, global = true)]
    pub socket_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    let client = Client::new(cli.socket_path.unwrap_or_else(default_socket_path));

    finish(match cli.command {
        Command::Track(args) => commands::track::run_track(&client, args),
        Command::Batch(args) => commands::track::run_batch(&client, args),
        Command::Count(args) => commands::count::run(&client, args),
        Command::Status => commands::status::run_status(&client),
        Command::Ping => commands::status::run_ping(&client),
        Command::Bench(args) => commands::bench::run(&client, args),
    })
}
