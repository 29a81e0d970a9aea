use std::sync::Arc;

use log::{debug, error, warn};
use viewtrack_ingest::IngestError;
use viewtrack_protocol::{
    DaemonRequest, DaemonResponse, RetrieveRequest, RetrieveResponse, TrackBatchRequest,
    TrackRequest,
};
use viewtrack_store::DEFAULT_RANGES;

use crate::state::DaemonState;

/// Delivers the response for one request. May run on a worker thread, after
/// `dispatch` has returned.
pub type Ack = Box<dyn FnOnce(DaemonResponse) + Send + 'static>;

pub fn dispatch(state: &Arc<DaemonState>, request: DaemonRequest, ack: Ack) {
    match request {
        DaemonRequest::Ping => ack(DaemonResponse::Pong),
        DaemonRequest::Status => ack(DaemonResponse::Status(state.status_line())),
        DaemonRequest::Track(req) => ack(track(state, req)),
        DaemonRequest::TrackDirect(req) => track_direct(state, req, ack),
        DaemonRequest::TrackBatch(batch) => track_batch(state, batch, ack),
        DaemonRequest::Retrieve(req) => ack(retrieve(state, req)),
    }
}

fn track(state: &DaemonState, req: TrackRequest) -> DaemonResponse {
    if req.id.trim().is_empty() {
        return DaemonResponse::client_error("id must not be empty");
    }

    match state.queue.enqueue(req.to_record()) {
        Ok(()) => {
            state.record_views(1);
            DaemonResponse::Accepted
        }
        Err(e) => ingest_error_response(&e),
    }
}

/// The batch is written on a pool worker, which sends the ack once the
/// write is over. Blocks while every worker is busy.
fn track_batch(state: &Arc<DaemonState>, batch: TrackBatchRequest, ack: Ack) {
    if batch.requests.iter().any(|r| r.id.trim().is_empty()) {
        ack(DaemonResponse::client_error("id must not be empty"));
        return;
    }

    let records = batch.to_records();
    let job_state = Arc::clone(state);

    // A job dropped by a stopped pool takes the ack with it; the client
    // sees the connection close without a response.
    state.pool.queue(move || {
        let response = match job_state.queue.batch_write(&records) {
            Ok(()) => {
                job_state.record_views(records.len());
                job_state.record_batch();
                DaemonResponse::Accepted
            }
            Err(IngestError::Stopped) => ingest_error_response(&IngestError::Stopped),
            Err(e) => {
                error!("Batch of {} views failed: {e}", records.len());
                DaemonResponse::Accepted
            }
        };
        ack(response);
    });
}

/// Single-view counterpart of [`track_batch`]: bypasses the buffer and acks
/// once the worker's write is over.
fn track_direct(state: &Arc<DaemonState>, req: TrackRequest, ack: Ack) {
    if req.id.trim().is_empty() {
        ack(DaemonResponse::client_error("id must not be empty"));
        return;
    }

    let record = req.to_record();
    let job_state = Arc::clone(state);

    state.pool.queue(move || {
        let response = match job_state.queue.write(&record) {
            Ok(()) => {
                job_state.record_views(1);
                DaemonResponse::Accepted
            }
            Err(IngestError::Stopped) => ingest_error_response(&IngestError::Stopped),
            Err(e) => {
                error!("View of {} failed: {e}", record.id);
                DaemonResponse::Accepted
            }
        };
        ack(response);
    });
}

fn retrieve(state: &DaemonState, req: RetrieveRequest) -> DaemonResponse {
    if req.id.trim().is_empty() {
        return DaemonResponse::client_error("id must not be empty");
    }

    let ranges = if req.ranges.is_empty() {
        DEFAULT_RANGES
    } else {
        req.ranges.as_slice()
    };

    match state.retriever.retrieve(&req.id, ranges) {
        Ok(counts) => {
            debug!("Retrieved {} counts for {}", counts.len(), req.id);
            DaemonResponse::Counts(RetrieveResponse { id: req.id, counts })
        }
        Err(e) => {
            warn!("Retrieve failed for {}: {e:#}", req.id);
            DaemonResponse::server_error(format!("Retrieve failed: {e:#}"))
        }
    }
}

fn ingest_error_response(err: &IngestError) -> DaemonResponse {
    if err.is_client_error() {
        DaemonResponse::client_error(err.to_string())
    } else {
        DaemonResponse::server_error(err.to_string())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
