pub mod codec;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use viewtrack_store::{Range, Record, ViewCount};

/// One view as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRequest {
    pub id: String,
    /// Nanoseconds since the Unix epoch.
    pub timestamp_nanos: i64,
}

impl TrackRequest {
    /// Timestamps outside what i64 nanoseconds can hold (before 1677 or
    /// after 2262) are stored as the Unix epoch.
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp_nanos: timestamp.timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    pub fn now(id: impl Into<String>) -> Self {
        Self::new(id, Utc::now())
    }

    pub fn to_record(&self) -> Record {
        Record::new(self.id.clone(), DateTime::from_timestamp_nanos(self.timestamp_nanos))
    }
}

impl From<&Record> for TrackRequest {
    fn from(record: &Record) -> Self {
        Self::new(record.id.clone(), record.timestamp)
    }
}

/// A pre-formed batch of views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackBatchRequest {
    pub requests: Vec<TrackRequest>,
    pub sent_timestamp_nanos: i64,
}

impl TrackBatchRequest {
    /// Stamped with the current time, so the nanosecond conversion cannot
    /// overflow until 2262.
    pub fn new(requests: Vec<TrackRequest>) -> Self {
        Self {
            requests,
            sent_timestamp_nanos: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    pub fn to_records(&self) -> Vec<Record> {
        self.requests.iter().map(TrackRequest::to_record).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub id: String,
    /// Empty means the daemon's default set of ranges.
    pub ranges: Vec<Range>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub id: String,
    pub counts: Vec<ViewCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input, or the daemon is shutting down.
    Client,
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum DaemonRequest {
    Track(TrackRequest),
    /// One view written straight to the store by a worker, acked after
    /// the write.
    TrackDirect(TrackRequest),
    TrackBatch(TrackBatchRequest),
    Retrieve(RetrieveRequest),
    Ping,
    Status,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum DaemonResponse {
    /// The view(s) were handed to the ingestion pipeline.
    Accepted,
    Counts(RetrieveResponse),
    Pong,
    Status(String),
    Error(ErrorResponse),
}

impl DaemonResponse {
    pub fn client_error(message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse {
            kind: ErrorKind::Client,
            message: message.into(),
        })
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse {
            kind: ErrorKind::Server,
            message: message.into(),
        })
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
