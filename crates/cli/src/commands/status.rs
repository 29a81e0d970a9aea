use viewtrack_protocol::{DaemonRequest, DaemonResponse};

use crate::client::{Client, unexpected};
use crate::commands::CommandResult;

pub fn run_status(client: &Client) -> CommandResult<()> {
    match client.request(&DaemonRequest::Status)? {
        DaemonResponse::Status(line) => {
            println!("socket={}", client.socket_path().display());
            println!("{line}");
            Ok(())
        }
        other => Err(unexpected(other)),
    }
}

pub fn run_ping(client: &Client) -> CommandResult<()> {
    match client.request(&DaemonRequest::Ping)? {
        DaemonResponse::Pong => {
            println!("pong");
            Ok(())
        }
        other => Err(unexpected(other)),
    }
}
