use std::io;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The queue or pool has begun shutting down.
    #[error("queue has stopped")]
    Stopped,

    /// Every write attempt against the sink failed.
    #[error("sink unavailable after {attempts} attempt(s): {source:#}")]
    SinkUnavailable {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker pool already started")]
    AlreadyStarted,

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),
}

impl IngestError {
    /// True for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::Stopped | IngestError::InvalidConfig(_))
    }
}
