use std::sync::Arc;

mod config;
mod pipeline;
mod rpc;
mod state;

use config::DaemonConfig;
use state::DaemonState;
use viewtrack_runtime::logging;

use log::info;

fn main() -> anyhow::Result<()> {
    logging::init().ok();

    let config = DaemonConfig::from_env()?;

    info!(
        "Starting viewtrack daemon: store={}, socket={}, batch_size={}, flush_interval={:?}, workers={}",
        config.store.name(),
        config.socket_path.display(),
        config.queue.max_batch_size,
        config.queue.flush_interval,
        config.workers,
    );

    let state = Arc::new(DaemonState::new(config)?);
    let served = rpc::run_rpc_server(Arc::clone(&state));

    let outcome = state.shutdown();
    info!("viewtrack daemon exited ({outcome:?})");

    served
}
