use clap::Args;
use viewtrack_protocol::{DaemonRequest, TrackBatchRequest, TrackRequest};

use crate::client::{Client, require_id};
use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Identifier of the viewed item
    pub id: String,

    /// Write through a daemon worker instead of the buffer; returns once stored
    #[arg(long)]
    pub direct: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Identifiers, one view each
    #[arg(required = true)]
    pub ids: Vec<String>,
}

pub fn run_track(client: &Client, args: TrackArgs) -> CommandResult<()> {
    require_id(&args.id)?;

    let req = TrackRequest::now(args.id);
    let request = if args.direct {
        DaemonRequest::TrackDirect(req)
    } else {
        DaemonRequest::Track(req)
    };

    client.submit(&request)?;
    println!("accepted");
    Ok(())
}

pub fn run_batch(client: &Client, args: BatchArgs) -> CommandResult<()> {
    for id in &args.ids {
        require_id(id)?;
    }

    let count = args.ids.len();
    let requests = args.ids.into_iter().map(TrackRequest::now).collect();

    client.submit(&DaemonRequest::TrackBatch(TrackBatchRequest::new(requests)))?;
    println!("accepted {count} views");
    Ok(())
}
