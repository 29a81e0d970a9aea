use super::*;
use std::{path::PathBuf, thread, time::Duration};

use crossbeam::channel::{self, Receiver};
use viewtrack_ingest::QueueConfig;
use viewtrack_protocol::ErrorKind;
use viewtrack_store::Range;

use crate::config::{DaemonConfig, StoreKind};

const FLUSH: Duration = Duration::from_millis(50);

fn memory_state() -> Arc<DaemonState> {
    let config = DaemonConfig {
        socket_path: PathBuf::from("/unused.sock"),
        store: StoreKind::Memory,
        data_path: PathBuf::from("/unused.ndjson"),
        queue: QueueConfig::new()
            .with_max_batch_size(100)
            .with_flush_interval(FLUSH),
        workers: 2,
        shutdown_timeout: Duration::from_secs(1),
    };
    Arc::new(DaemonState::new(config).expect("state"))
}

fn send(state: &Arc<DaemonState>, request: DaemonRequest) -> Receiver<DaemonResponse> {
    let (tx, rx) = channel::bounded(1);
    dispatch(
        state,
        request,
        Box::new(move |response| {
            let _ = tx.send(response);
        }),
    );
    rx
}

fn roundtrip(state: &Arc<DaemonState>, request: DaemonRequest) -> DaemonResponse {
    send(state, request)
        .recv_timeout(Duration::from_secs(2))
        .expect("response")
}

fn counts(state: &Arc<DaemonState>, id: &str, ranges: Vec<Range>) -> Vec<u64> {
    match roundtrip(
        state,
        DaemonRequest::Retrieve(RetrieveRequest {
            id: id.into(),
            ranges,
        }),
    ) {
        DaemonResponse::Counts(resp) => {
            assert_eq!(resp.id, id);
            resp.counts.iter().map(|c| c.count).collect()
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

fn assert_client_error(response: DaemonResponse) {
    match response {
        DaemonResponse::Error(err) => assert_eq!(err.kind, ErrorKind::Client),
        other => panic!("expected client error, got {other:?}"),
    }
}

#[test]
fn ping_and_status() {
    let state = memory_state();

    assert!(matches!(
        roundtrip(&state, DaemonRequest::Ping),
        DaemonResponse::Pong
    ));

    match roundtrip(&state, DaemonRequest::Status) {
        DaemonResponse::Status(line) => {
            assert!(line.contains("store=memory"), "{line}");
            assert!(line.contains("workers=2"), "{line}");
        }
        other => panic!("unexpected response: {other:?}"),
    }

    state.shutdown();
}

#[test]
fn tracked_view_is_counted_after_flush() {
    let state = memory_state();

    assert!(matches!(
        roundtrip(&state, DaemonRequest::Track(TrackRequest::now("article-1"))),
        DaemonResponse::Accepted
    ));

    thread::sleep(FLUSH * 4);
    assert_eq!(counts(&state, "article-1", vec![Range::OneMinute]), vec![1]);
    assert_eq!(counts(&state, "article-2", vec![Range::OneMinute]), vec![0]);

    state.shutdown();
}

#[test]
fn empty_ids_are_client_errors() {
    let state = memory_state();

    assert_client_error(roundtrip(
        &state,
        DaemonRequest::Track(TrackRequest::now("  ")),
    ));
    assert_client_error(roundtrip(
        &state,
        DaemonRequest::TrackBatch(TrackBatchRequest::new(vec![
            TrackRequest::now("ok"),
            TrackRequest::now(""),
        ])),
    ));
    assert_client_error(roundtrip(
        &state,
        DaemonRequest::Retrieve(RetrieveRequest {
            id: String::new(),
            ranges: Vec::new(),
        }),
    ));

    state.shutdown();
}

#[test]
fn batch_is_acked_after_it_is_written() {
    let state = memory_state();

    let batch = TrackBatchRequest::new(vec![
        TrackRequest::now("video"),
        TrackRequest::now("video"),
        TrackRequest::now("video"),
    ]);
    assert!(matches!(
        roundtrip(&state, DaemonRequest::TrackBatch(batch)),
        DaemonResponse::Accepted
    ));

    // No flush interval wait: the batch bypassed the buffer.
    assert_eq!(counts(&state, "video", vec![Range::OneMinute]), vec![3]);

    state.shutdown();
}

#[test]
fn direct_view_is_counted_without_waiting_for_a_flush() {
    let state = memory_state();

    assert!(matches!(
        roundtrip(&state, DaemonRequest::TrackDirect(TrackRequest::now("clip"))),
        DaemonResponse::Accepted
    ));
    assert_eq!(counts(&state, "clip", vec![Range::OneMinute]), vec![1]);

    assert_client_error(roundtrip(
        &state,
        DaemonRequest::TrackDirect(TrackRequest::now("")),
    ));

    state.shutdown();
}

#[test]
fn retrieve_without_ranges_uses_defaults() {
    let state = memory_state();

    match roundtrip(
        &state,
        DaemonRequest::Retrieve(RetrieveRequest {
            id: "anything".into(),
            ranges: Vec::new(),
        }),
    ) {
        DaemonResponse::Counts(resp) => {
            let descriptions: Vec<_> = resp.counts.iter().map(|c| c.description.as_str()).collect();
            let expected: Vec<_> = DEFAULT_RANGES.iter().map(|r| r.description()).collect();
            assert_eq!(descriptions, expected);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    state.shutdown();
}

#[test]
fn shutdown_flushes_buffered_views() {
    let state = memory_state();

    for _ in 0..5 {
        roundtrip(&state, DaemonRequest::Track(TrackRequest::now("page")));
    }
    state.shutdown();

    assert_eq!(counts(&state, "page", vec![Range::OneMinute]), vec![5]);
}

#[test]
fn requests_after_shutdown() {
    let state = memory_state();
    state.shutdown();

    assert_client_error(roundtrip(
        &state,
        DaemonRequest::Track(TrackRequest::now("late")),
    ));

    // The stopped pool drops the job along with its ack.
    let rx = send(
        &state,
        DaemonRequest::TrackBatch(TrackBatchRequest::new(vec![TrackRequest::now("late")])),
    );
    assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
}
