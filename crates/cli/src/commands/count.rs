use std::io;

use clap::Args;
use viewtrack_protocol::{DaemonRequest, DaemonResponse, RetrieveRequest};
use viewtrack_store::Range;

use crate::client::{Client, require_id, unexpected};
use crate::commands::CommandResult;
use crate::printer::{CountPrinter, HumanPrinter, JsonPrinter};

#[derive(Debug, Args)]
pub struct CountArgs {
    /// Identifier to count views for
    pub id: String,

    /// Look-back range: 1m, 5m, 1h, 1d, 7d or 30d (repeatable; default 5m..30d)
    #[arg(long = "range", short = 'r', value_parser = parse_range)]
    pub ranges: Vec<Range>,

    /// Output counts as a single JSON object
    #[arg(long)]
    pub json: bool,
}

fn parse_range(s: &str) -> Result<Range, String> {
    Range::from_short_name(s).ok_or_else(|| {
        let known: Vec<&str> = Range::ALL.iter().map(|r| r.short_name()).collect();
        format!("unknown range '{s}' (expected one of {})", known.join(", "))
    })
}

pub fn run(client: &Client, args: CountArgs) -> CommandResult<()> {
    require_id(&args.id)?;

    let request = DaemonRequest::Retrieve(RetrieveRequest {
        id: args.id,
        ranges: args.ranges,
    });

    let resp = match client.request(&request)? {
        DaemonResponse::Counts(resp) => resp,
        other => return Err(unexpected(other)),
    };

    let mut printer: Box<dyn CountPrinter> = if args.json {
        Box::new(JsonPrinter::new(io::stdout()))
    } else {
        Box::new(HumanPrinter::new(io::stdout()))
    };

    printer.print(&resp)?;
    Ok(())
}
