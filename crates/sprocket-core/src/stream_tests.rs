use std::io::{Read, Seek, SeekFrom};

use pretty_assertions::assert_eq;

use crate::error::ProcError;
use crate::fixtures::Document;
use crate::proc::{CallOptions, StoredProc};
use crate::stream::MemoryStream;
use crate::stub::StubTransport;
use crate::types::Value;

fn get_document() -> StoredProc<Document> {
    StoredProc::named("sp_GetDocument")
}

#[tokio::test]
async fn streams_a_column_to_a_file_named_by_a_sibling_field() {
    let dir = tempfile::tempdir().unwrap();
    let transport = StubTransport::new().with_result_set(
        &["FileName", "Body"],
        vec![vec![
            Value::String("report.bin".to_string()),
            Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]),
        ]],
    );

    let rows = get_document()
        .call::<(Vec<Document>,)>(
            &transport,
            None,
            CallOptions::new().stream_to(dir.path()),
        )
        .await
        .unwrap()
        .into_rows();

    assert_eq!(rows[0].file_name, "report.bin");
    let written = std::fs::read(dir.path().join("report.bin")).unwrap();
    assert_eq!(written, vec![0xDE, 0xAD, 0xBE, 0xEF]);
}

#[tokio::test]
async fn character_columns_stream_as_utf8_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let transport = StubTransport::new().with_result_set(
        &["FileName", "Body"],
        vec![vec![
            Value::String("notes.txt".to_string()),
            Value::String("hello stream".to_string()),
        ]],
    );

    get_document()
        .call::<(Vec<Document>,)>(
            &transport,
            None,
            CallOptions::new().stream_to(dir.path()),
        )
        .await
        .unwrap();

    let written = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
    assert_eq!(written, "hello stream");
}

#[tokio::test]
async fn null_streamed_column_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let transport = StubTransport::new().with_result_set(
        &["FileName", "Body"],
        vec![vec![Value::String("empty.bin".to_string()), Value::Null]],
    );

    let rows = get_document()
        .call::<(Vec<Document>,)>(
            &transport,
            None,
            CallOptions::new().stream_to(dir.path()),
        )
        .await
        .unwrap()
        .into_rows();

    assert_eq!(rows.len(), 1);
    assert!(!dir.path().join("empty.bin").exists());
}

#[tokio::test]
async fn file_destination_without_a_stream_directory_is_a_configuration_error() {
    let transport = StubTransport::new().with_result_set(
        &["FileName", "Body"],
        vec![vec![
            Value::String("report.bin".to_string()),
            Value::Bytes(vec![1, 2, 3]),
        ]],
    );

    let err = get_document()
        .call::<(Vec<Document>,)>(&transport, None, CallOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProcError::Configuration(_)));
}

#[tokio::test]
async fn empty_file_name_field_fails_the_streamed_column() {
    let dir = tempfile::tempdir().unwrap();
    let transport = StubTransport::new().with_result_set(
        &["FileName", "Body"],
        vec![vec![
            Value::String(String::new()),
            Value::Bytes(vec![1, 2, 3]),
        ]],
    );

    let err = get_document()
        .call::<(Vec<Document>,)>(
            &transport,
            None,
            CallOptions::new().stream_to(dir.path()),
        )
        .await
        .unwrap_err();

    match err {
        ProcError::FieldMapping { column, record, .. } => {
            assert_eq!(column, "Body");
            assert_eq!(record, "Document");
        }
        other => panic!("expected field mapping error, got {other:?}"),
    }
}

#[tokio::test]
async fn memory_destinations_deliver_each_shape() {
    let transport = StubTransport::new().with_result_set(
        &["PreviewBytes", "PreviewText", "PreviewHandle"],
        vec![vec![
            Value::Bytes(vec![1, 2, 3]),
            Value::String("summary".to_string()),
            Value::Bytes(b"handle data".to_vec()),
        ]],
    );

    let rows = get_document()
        .call::<(Vec<Document>,)>(&transport, None, CallOptions::new())
        .await
        .unwrap()
        .into_rows();

    let doc = &rows[0];
    assert_eq!(doc.preview_bytes, vec![1, 2, 3]);
    assert_eq!(doc.preview_text, "summary");

    let handle = rows.into_iter().next().unwrap().preview_handle.unwrap();
    assert_eq!(handle.len(), 11);
    assert_eq!(handle.into_inner(), b"handle data");
}

#[tokio::test]
async fn text_shape_accepts_binary_columns_that_hold_utf8() {
    let transport = StubTransport::new().with_result_set(
        &["PreviewText"],
        vec![vec![Value::Bytes(b"from bytes".to_vec())]],
    );

    let rows = get_document()
        .call::<(Vec<Document>,)>(&transport, None, CallOptions::new())
        .await
        .unwrap()
        .into_rows();

    assert_eq!(rows[0].preview_text, "from bytes");
}

#[tokio::test]
async fn non_streamable_column_value_is_a_field_mapping_error() {
    let transport = StubTransport::new()
        .with_result_set(&["PreviewBytes"], vec![vec![Value::Int32(5)]]);

    let err = get_document()
        .call::<(Vec<Document>,)>(&transport, None, CallOptions::new())
        .await
        .unwrap_err();

    match err {
        ProcError::FieldMapping { column, .. } => assert_eq!(column, "PreviewBytes"),
        other => panic!("expected field mapping error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_interrupts_a_file_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("halted.bin");
    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();

    let err = crate::stream::copy_to_file(&path, &[1, 2, 3], &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ProcError::Cancelled));
    assert!(!path.exists());
}

#[test]
fn memory_stream_reads_and_seeks() {
    let mut stream = MemoryStream::new(vec![10, 20, 30, 40]);
    assert_eq!(stream.len(), 4);
    assert!(!stream.is_empty());

    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).unwrap();
    assert_eq!(buf, [10, 20]);

    stream.seek(SeekFrom::Start(1)).unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, vec![20, 30, 40]);
}
