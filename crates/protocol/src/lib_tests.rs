use super::*;
use chrono::TimeZone;

#[test]
fn track_request_keeps_nanosecond_timestamps() {
    let ts = Utc
        .with_ymd_and_hms(2026, 3, 4, 5, 6, 7)
        .unwrap()
        .checked_add_signed(chrono::TimeDelta::nanoseconds(123_456_789))
        .expect("add nanos");

    let req = TrackRequest::new("item-7", ts);
    let record = req.to_record();

    assert_eq!(record.id, "item-7");
    assert_eq!(record.timestamp, ts);
    assert_eq!(TrackRequest::from(&record), req);
}

#[test]
fn batch_request_preserves_order() {
    let batch = TrackBatchRequest::new(vec![
        TrackRequest::now("a"),
        TrackRequest::now("b"),
        TrackRequest::now("c"),
    ]);

    let ids: Vec<String> = batch.to_records().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(batch.sent_timestamp_nanos > 0);
}

#[test]
fn error_constructors_set_kind() {
    match DaemonResponse::client_error("bad") {
        DaemonResponse::Error(e) => assert_eq!(e.kind, ErrorKind::Client),
        other => panic!("unexpected {other:?}"),
    }
    match DaemonResponse::server_error("boom") {
        DaemonResponse::Error(e) => assert_eq!(e.kind, ErrorKind::Server),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn out_of_range_timestamp_falls_back_to_epoch() {
    let far_future = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();

    let req = TrackRequest::new("item-7", far_future);

    assert_eq!(req.timestamp_nanos, 0);
    assert_eq!(req.to_record().timestamp, DateTime::UNIX_EPOCH);
}
