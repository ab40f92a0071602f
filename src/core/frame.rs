//! Purpose: Describe a completed binary frame file and scan it row by row.
//! Exports: `Frame`, `Rows`.
//! Role: Binds a data file to column names, schema, and row count; entry point for decode.
//! Invariants: A `Frame` is immutable once built and refers to a fully written file.
//! Invariants: Every `rows()` call opens the file again and scans from byte 0.
//! Invariants: A scan yields at most `count` rows and stops after the first error.
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::codec::FrameDecoder;
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::value::{FrameValue, Schema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    path: PathBuf,
    column_names: Vec<String>,
    schema: Schema,
    count: u64,
}

impl Frame {
    pub fn new(
        path: impl Into<PathBuf>,
        column_names: Vec<String>,
        schema: Schema,
        count: u64,
    ) -> Self {
        Self {
            path: path.into(),
            column_names,
            schema,
            count,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Starts an independent forward-only scan over all `count` rows.
    pub fn rows(&self) -> Result<Rows, Error> {
        let file = File::open(&self.path)
            .map_err(|err| io_error(err, "failed to open frame").with_path(&self.path))?;
        Ok(Rows {
            decoder: FrameDecoder::new(BufReader::new(file)),
            schema: self.schema.clone(),
            path: self.path.clone(),
            next_row: 0,
            count: self.count,
            failed: false,
        })
    }

    /// Writes this descriptor as JSON. The frame file itself never carries it.
    pub fn save_descriptor(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode frame descriptor")
                .with_source(err)
        })?;
        fs::write(path, json)
            .map_err(|err| io_error(err, "failed to write frame descriptor").with_path(path))
    }

    pub fn load_descriptor(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|err| io_error(err, "failed to read frame descriptor").with_path(path))?;
        serde_json::from_slice(&bytes).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("invalid frame descriptor")
                .with_path(path)
                .with_source(err)
        })
    }
}

pub struct Rows {
    decoder: FrameDecoder<BufReader<File>>,
    schema: Schema,
    path: PathBuf,
    next_row: u64,
    count: u64,
    failed: bool,
}

impl Rows {
    /// Index of the next row to be decoded.
    pub fn position(&self) -> u64 {
        self.next_row
    }
}

impl Iterator for Rows {
    type Item = Result<Vec<FrameValue>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_row >= self.count {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;
        match self.decoder.read_row(&self.schema) {
            Ok(values) => Some(Ok(values)),
            Err(err) => {
                self.failed = true;
                Some(Err(err.with_path(&self.path).with_row(row)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = usize::try_from(self.count - self.next_row).ok();
        (0, remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use crate::core::codec::FrameEncoder;
    use crate::core::error::ErrorKind;
    use crate::core::value::{ColumnType, FrameValue, Schema};
    use std::fs::File;
    use std::io::BufWriter;

    fn write_numbers(path: &std::path::Path, values: &[f64]) {
        let file = File::create(path).expect("create");
        let mut encoder = FrameEncoder::new(BufWriter::new(file));
        for value in values {
            encoder.write_number(*value).expect("write");
        }
        encoder.finish().expect("finish");
    }

    fn numeric_frame(path: &std::path::Path, count: u64) -> Frame {
        Frame::new(
            path,
            vec!["x".to_string()],
            Schema::uniform(ColumnType::Numeric, 1),
            count,
        )
    }

    #[test]
    fn missing_file_fails_at_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let frame = numeric_frame(&dir.path().join("absent.frame"), 1);
        let err = frame.rows().err().expect("should fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.path().is_some());
    }

    #[test]
    fn scan_stops_at_declared_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.frame");
        write_numbers(&path, &[1.0, 2.0, 3.0]);

        let rows = numeric_frame(&path, 2)
            .rows()
            .expect("rows")
            .collect::<Result<Vec<_>, _>>()
            .expect("decode");
        assert_eq!(
            rows,
            vec![vec![FrameValue::Number(1.0)], vec![FrameValue::Number(2.0)]]
        );
    }

    #[test]
    fn overrun_reports_truncation_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.frame");
        write_numbers(&path, &[1.0]);

        let mut rows = numeric_frame(&path, 3).rows().expect("rows");
        assert!(rows.next().expect("first").is_ok());
        let err = rows.next().expect("second").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Truncated);
        assert_eq!(err.row(), Some(1));
        assert!(rows.next().is_none());
    }

    #[test]
    fn scans_are_independent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.frame");
        write_numbers(&path, &[4.0, 5.0]);
        let frame = numeric_frame(&path, 2);

        let mut first = frame.rows().expect("rows");
        first.next();
        assert_eq!(first.position(), 1);
        let second = frame
            .rows()
            .expect("rows")
            .collect::<Result<Vec<_>, _>>()
            .expect("decode");
        assert_eq!(second.len(), 2);
        assert_eq!(second[0], vec![FrameValue::Number(4.0)]);
    }

    #[test]
    fn descriptor_round_trips_through_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let frame = Frame::new(
            dir.path().join("data.frame"),
            vec!["a".to_string(), "b".to_string()],
            Schema::new(vec![ColumnType::Categorical, ColumnType::Binary]),
            12,
        );
        let descriptor = dir.path().join("data.frame.json");
        frame.save_descriptor(&descriptor).expect("save");
        let loaded = Frame::load_descriptor(&descriptor).expect("load");
        assert_eq!(loaded, frame);
    }

    #[test]
    fn garbage_descriptor_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = dir.path().join("bad.json");
        std::fs::write(&descriptor, b"{not json").expect("write");
        let err = Frame::load_descriptor(&descriptor).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }
}
