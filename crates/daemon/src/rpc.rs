use std::fs;
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use log::{debug, error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use viewtrack_protocol::DaemonRequest;
use viewtrack_protocol::codec::{read_message, write_message};

use crate::pipeline::{self, Ack};
use crate::state::DaemonState;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// RAII guard that ensures the Unix socket file is removed on shutdown,
/// even if we return early or panic.
struct SocketGuard<'a> {
    path: &'a Path,
}

impl<'a> Drop for SocketGuard<'a> {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            error!(
                "Failed to remove Unix socket at {} on shutdown: {err}",
                self.path.display()
            );
        }
    }
}

/// Bind the configured socket and serve until SIGINT or SIGTERM.
pub fn run_rpc_server(state: Arc<DaemonState>) -> anyhow::Result<()> {
    let socket_path = state.config.socket_path.clone();

    let shutdown = Arc::new(AtomicBool::new(false));

    // Register signal handlers. They only set the atomic flag
    for sig in [SIGINT, SIGTERM] {
        flag::register(sig, Arc::clone(&shutdown))
            .with_context(|| format!("Failed to register signal handler for {sig}"))?;
    }

    // Clean up stale socket if it exists.
    if socket_path.exists() {
        fs::remove_file(&socket_path).with_context(|| {
            format!(
                "Failed to remove existing socket at {}",
                socket_path.display()
            )
        })?;
    }

    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("Failed to bind Unix socket at {}", socket_path.display()))?;

    // Ensure socket is cleaned up on any exit path.
    let _socket_guard = SocketGuard {
        path: socket_path.as_path(),
    };

    info!("viewtrack daemon listening on {}", socket_path.display());

    serve(listener, state, &shutdown)
}

/// Accept connections until `shutdown` is set.
///
/// The listener is polled so the flag is seen within one poll interval even
/// when no client connects.
pub fn serve(
    listener: UnixListener,
    state: Arc<DaemonState>,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    listener
        .set_nonblocking(true)
        .context("Failed to make listener non-blocking")?;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown signal observed; stopping RPC server.");
            break;
        }

        match listener.accept() {
            Ok((stream, _addr)) => {
                let state = Arc::clone(&state);
                let spawned = thread::Builder::new()
                    .name("viewtrack-client".into())
                    .spawn(move || {
                        if let Err(err) = handle_client(stream, state) {
                            error!("Error while handling client: {err:#}");
                        }
                    });

                if let Err(err) = spawned {
                    error!("Failed to spawn client thread: {err}");
                }
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!("Accept error: {err}");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }

    info!("RPC server shutdown complete.");
    Ok(())
}

fn handle_client(mut stream: UnixStream, state: Arc<DaemonState>) -> anyhow::Result<()> {
    // Accepted sockets inherit O_NONBLOCK on some platforms.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;

    let request: DaemonRequest =
        read_message(&mut stream).context("Failed to read DaemonRequest")?;

    debug!("Received request: {:?}", request);

    let ack: Ack = Box::new(move |response| {
        if let Err(err) = write_message(&mut stream, &response) {
            error!("Failed to write DaemonResponse: {err:#}");
        }
    });

    pipeline::dispatch(&state, request, ack);
    Ok(())
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
