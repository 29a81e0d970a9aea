use std::path::PathBuf;
use std::time::Duration;

pub const PROGRAM_NAME: &str = "viewtrack";
pub const PROGRAM_LOG_LEVEL: &str = "VIEWTRACK_LOG_LEVEL";

pub const SOCKET_FILE_NAME: &str = "viewtrack.sock";
pub const DATA_FILE_NAME: &str = "views.ndjson";

/// Records per flushed batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;
/// Upper bound on how long a record waits in the buffer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);
/// Capacity of the intake channel in front of the accumulation thread.
pub const DEFAULT_INTAKE_CAPACITY: usize = 128;
/// Total write attempts per batch, first try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
/// Linear backoff step: attempt `n` sleeps `n * DEFAULT_BACKOFF_UNIT`.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

pub fn xdg_or_home(xdg_var: &str, home_suffix: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(xdg_var) {
        PathBuf::from(dir)
    } else {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix)
    }
}

/// Directory for the daemon socket.
///
/// Prefers the per-user runtime dir, falls back to the cache dir on
/// platforms without one (macOS).
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| xdg_or_home("XDG_CACHE_HOME", ".cache"))
        .join(PROGRAM_NAME)
}

pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| xdg_or_home("XDG_DATA_HOME", ".local/share"))
        .join(PROGRAM_NAME)
}

/// Default Unix socket the daemon listens on and the CLI connects to.
pub fn default_socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_FILE_NAME)
}

/// Default NDJSON log used by the file store.
pub fn default_data_path() -> PathBuf {
    data_dir().join(DATA_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
