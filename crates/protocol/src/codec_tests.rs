use super::*;
use crate::{DaemonRequest, DaemonResponse, ErrorKind, TrackBatchRequest, TrackRequest};
use std::io::Cursor;

#[test]
fn frame_starts_with_big_endian_length() {
    let mut buf = Vec::new();
    write_message(&mut buf, &DaemonRequest::Ping).expect("write");

    let len = u32::from_be_bytes(buf[..4].try_into().expect("prefix")) as usize;
    assert_eq!(len, buf.len() - 4);
}

#[test]
fn several_messages_share_one_stream() {
    let mut buf = Vec::new();
    write_message(&mut buf, &DaemonRequest::Track(TrackRequest::now("a"))).expect("write");
    write_message(
        &mut buf,
        &DaemonRequest::TrackBatch(TrackBatchRequest::new(vec![
            TrackRequest::now("b"),
            TrackRequest::now("c"),
        ])),
    )
    .expect("write");

    let mut cursor = Cursor::new(buf);
    match read_message::<_, DaemonRequest>(&mut cursor).expect("first") {
        DaemonRequest::Track(req) => assert_eq!(req.id, "a"),
        other => panic!("unexpected {other:?}"),
    }
    match read_message::<_, DaemonRequest>(&mut cursor).expect("second") {
        DaemonRequest::TrackBatch(batch) => assert_eq!(batch.requests.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    assert!(read_message::<_, DaemonRequest>(&mut cursor).is_err());
}

#[test]
fn truncated_frame_is_an_error() {
    let mut buf = Vec::new();
    write_message(&mut buf, &DaemonResponse::client_error("empty id")).expect("write");
    buf.truncate(buf.len() - 1);

    assert!(read_message::<_, DaemonResponse>(&mut Cursor::new(buf)).is_err());
}

#[test]
fn oversized_length_prefix_is_rejected() {
    let mut buf = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
    buf.extend_from_slice(&[0u8; 8]);

    let err = read_message::<_, DaemonRequest>(&mut Cursor::new(buf)).expect_err("too large");
    assert!(err.to_string().contains("exceeds limit"));
}

#[test]
fn error_response_keeps_its_kind() {
    let mut buf = Vec::new();
    write_message(&mut buf, &DaemonResponse::server_error("disk full")).expect("write");

    match read_message::<_, DaemonResponse>(&mut Cursor::new(buf)).expect("read") {
        DaemonResponse::Error(e) => {
            assert_eq!(e.kind, ErrorKind::Server);
            assert_eq!(e.message, "disk full");
        }
        other => panic!("unexpected {other:?}"),
    }
}
