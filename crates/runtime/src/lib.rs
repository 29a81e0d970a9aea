mod config;
pub mod logging;

pub use config::{
    DATA_FILE_NAME, DEFAULT_BACKOFF_UNIT, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_INTAKE_CAPACITY, DEFAULT_MAX_ATTEMPTS, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WORKERS,
    PROGRAM_LOG_LEVEL, PROGRAM_NAME, SOCKET_FILE_NAME, data_dir, default_data_path,
    default_socket_path, runtime_dir, xdg_or_home,
};

pub use logging::init;
