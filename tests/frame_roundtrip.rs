// End-to-end ingest, scan, and infer flows through the public API.
use std::fs;
use std::path::Path;

use csvframe::api::{
    ColumnType, ErrorKind, Frame, FrameValue, IngestOptions, Schema, infer, ingest_csv,
};

fn write_source(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write source");
    path
}

fn scan(frame: &Frame) -> Vec<Vec<FrameValue>> {
    frame
        .rows()
        .expect("rows")
        .collect::<Result<Vec<_>, _>>()
        .expect("decode")
}

#[test]
fn typed_ingest_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = write_source(
        dir.path(),
        "people.csv",
        "\"id\",\"name\",\"score\",\"active\"\n1,\"ann\",3.5,yes\n2,\"bob\",abc,no\n3,\"cy\",-1e3,1\n",
    );
    let schema: Schema = "n,c,n,b".parse().expect("schema");
    let frame = ingest_csv(&src, dir.path().join("people.frame"), &schema, IngestOptions::default())
        .expect("ingest");

    assert_eq!(frame.column_names(), ["id", "name", "score", "active"]);
    assert_eq!(frame.count(), 3);

    let rows = scan(&frame);
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        vec![
            FrameValue::Number(1.0),
            FrameValue::Category("ann".to_string()),
            FrameValue::Number(3.5),
            FrameValue::Binary(true),
        ]
    );
    assert!(matches!(rows[1][2], FrameValue::Number(value) if value.is_nan()));
    assert_eq!(rows[1][3], FrameValue::Binary(false));
    assert_eq!(rows[2][2], FrameValue::Number(-1000.0));
}

#[test]
fn row_count_matches_data_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut text = String::from("k,v\n");
    for i in 0..2500 {
        text.push_str(&format!("key{i},{i}\n"));
    }
    let src = write_source(dir.path(), "kv.csv", &text);
    let schema = Schema::new(vec![ColumnType::Categorical, ColumnType::Numeric]);
    let options = IngestOptions::default().with_heartbeat_every(1000);
    let frame = ingest_csv(&src, dir.path().join("kv.frame"), &schema, options).expect("ingest");

    assert_eq!(frame.count(), 2500);
    let rows = scan(&frame);
    assert_eq!(rows.len(), 2500);
    assert_eq!(rows[2499][1], FrameValue::Number(2499.0));
}

#[test]
fn scans_are_repeatable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = write_source(dir.path(), "a.csv", "x,y\nred,1\nblue,2\n");
    let frame = ingest_csv(
        &src,
        dir.path().join("a.frame"),
        &Schema::uniform(ColumnType::Categorical, 2),
        IngestOptions::default(),
    )
    .expect("ingest");

    assert_eq!(scan(&frame), scan(&frame));
}

#[test]
fn short_line_consumes_only_leading_slots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = write_source(dir.path(), "short.csv", "a,b,c\n1,2\n");
    let schema = Schema::uniform(ColumnType::Numeric, 3);
    let frame = ingest_csv(&src, dir.path().join("short.frame"), &schema, IngestOptions::default())
        .expect("ingest");

    assert_eq!(frame.count(), 1);
    assert_eq!(fs::metadata(frame.path()).expect("meta").len(), 16);

    let err = frame
        .rows()
        .expect("rows")
        .next()
        .expect("row")
        .expect_err("third slot has no bytes");
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert_eq!(err.row(), Some(0));
    assert_eq!(err.column(), Some(2));
}

#[test]
fn fewer_rows_than_written_is_fine() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = write_source(dir.path(), "n.csv", "n\n1\n2\n3\n");
    let schema = Schema::uniform(ColumnType::Numeric, 1);
    let frame = ingest_csv(&src, dir.path().join("n.frame"), &schema, IngestOptions::default())
        .expect("ingest");

    let partial = Frame::new(frame.path(), frame.column_names().to_vec(), schema, 2);
    assert_eq!(scan(&partial).len(), 2);
}

#[test]
fn infer_refines_all_categorical_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut text = String::from("\"id\",\"color\",\"ratio\",\"level\",\"price\"\n");
    for i in 0..60 {
        let color = ["red", "green", "blue"][i % 3];
        let ratio = format!("{}.25", i);
        let level = i % 4;
        let price = if i < 40 { format!("{i}") } else { format!("{i}.5") };
        text.push_str(&format!("{i},{color},{ratio},{level},{price}\n"));
    }
    let src = write_source(dir.path(), "mixed.csv", &text);
    let frame = ingest_csv(
        &src,
        dir.path().join("mixed.frame"),
        &Schema::uniform(ColumnType::Categorical, 5),
        IngestOptions::default(),
    )
    .expect("ingest");

    let schema = infer(&frame).expect("infer");
    assert_eq!(
        schema.columns(),
        &[
            ColumnType::Numeric,
            ColumnType::Categorical,
            ColumnType::Categorical,
            ColumnType::Numeric,
            ColumnType::Numeric,
        ]
    );
}

#[test]
fn infer_surfaces_truncated_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.frame");
    fs::write(&path, [3u8, b'a']).expect("write");
    let frame = Frame::new(
        &path,
        vec!["x".to_string()],
        Schema::uniform(ColumnType::Categorical, 1),
        1,
    );
    let err = infer(&frame).expect_err("should fail");
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert_eq!(err.path(), Some(path.as_path()));
}
