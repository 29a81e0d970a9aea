use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use viewtrack_protocol::codec::{read_message, write_message};
use viewtrack_protocol::{DaemonRequest, DaemonResponse, ErrorKind};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// One-request-per-connection client for the daemon socket.
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
}

impl Client {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn request(&self, request: &DaemonRequest) -> Result<DaemonResponse> {
        let mut stream = UnixStream::connect(&self.socket_path).with_context(|| {
            format!(
                "failed to connect to viewtrack daemon at {}",
                self.socket_path.display()
            )
        })?;
        stream.set_read_timeout(Some(RESPONSE_TIMEOUT))?;

        write_message(&mut stream, request)?;
        read_message(&mut stream).context("daemon closed the connection without a response")
    }

    /// Send a request that should come back `Accepted`.
    pub fn submit(&self, request: &DaemonRequest) -> Result<()> {
        match self.request(request)? {
            DaemonResponse::Accepted => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

/// Turn a response the caller did not ask for into an error.
pub fn unexpected(response: DaemonResponse) -> anyhow::Error {
    match response {
        DaemonResponse::Error(err) => match err.kind {
            ErrorKind::Client => anyhow!("rejected by daemon: {}", err.message),
            ErrorKind::Server => anyhow!("daemon error: {}", err.message),
        },
        other => anyhow!("unexpected daemon response: {other:?}"),
    }
}

pub fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("id must not be empty");
    }
    Ok(())
}
