//! Purpose: Turn delimited source text into records of trimmed string fields.
//! Exports: `SplitMode`, `RecordSource`, `NaiveLines`, `QuotedRecords`, `split_naive`, `trim_quotes`.
//! Role: Field-splitting layer under the CSV ingestor.
//! Invariants: Naive mode splits on every delimiter byte; quotes never protect a delimiter.
//! Invariants: Naive mode trims at most one leading and one trailing quote per field.
//! Invariants: Quoted mode is a separate parser and never changes naive behavior.
//! Invariants: Quoted mode counts records, not lines; it skips blank lines.
//! Invariants: Invalid UTF-8 is decoded lossily, never rejected.
use std::io::{BufRead, Read};

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, io_error};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One record per physical line, blank lines included.
    #[default]
    Naive,
    /// One record per CSV record: quoted fields may span lines and blank lines are skipped.
    Quoted,
}

/// Sequential source of records; the first record is the header.
pub trait RecordSource {
    fn next_record(&mut self) -> Result<Option<Vec<String>>, Error>;
}

pub struct NaiveLines<R: BufRead> {
    reader: R,
    delimiter: char,
    quote: char,
    line: Vec<u8>,
}

impl<R: BufRead> NaiveLines<R> {
    pub fn new(reader: R, delimiter: u8, quote: char) -> Self {
        Self {
            reader,
            delimiter: char::from(delimiter),
            quote,
            line: Vec::new(),
        }
    }
}

impl<R: BufRead> RecordSource for NaiveLines<R> {
    fn next_record(&mut self) -> Result<Option<Vec<String>>, Error> {
        self.line.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|err| io_error(err, "failed to read source line"))?;
        if read == 0 {
            return Ok(None);
        }
        let mut bytes = self.line.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        let text = bytes.to_str_lossy();
        Ok(Some(split_naive(&text, self.delimiter, self.quote)))
    }
}

pub struct QuotedRecords<R: Read> {
    reader: csv::Reader<R>,
    record: csv::ByteRecord,
}

impl<R: Read> QuotedRecords<R> {
    pub fn new(reader: R, delimiter: u8, quote: u8) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .quote(quote)
            .from_reader(reader);
        Self {
            reader,
            record: csv::ByteRecord::new(),
        }
    }
}

impl<R: Read> RecordSource for QuotedRecords<R> {
    fn next_record(&mut self) -> Result<Option<Vec<String>>, Error> {
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .map_err(csv_error)?;
        if !more {
            return Ok(None);
        }
        let fields = self
            .record
            .iter()
            .map(|field| field.to_str_lossy().into_owned())
            .collect();
        Ok(Some(fields))
    }
}

fn csv_error(err: csv::Error) -> Error {
    // Record 0 is the header, so data rows start at record 1.
    let row = err
        .position()
        .and_then(|position| position.record().checked_sub(1));
    let mapped = match err.into_kind() {
        csv::ErrorKind::Io(io) => return io_error(io, "failed to read source"),
        kind => Error::new(ErrorKind::Corrupt)
            .with_message(format!("malformed quoted record: {kind:?}")),
    };
    match row {
        Some(row) => mapped.with_row(row),
        None => mapped,
    }
}

pub fn split_naive(line: &str, delimiter: char, quote: char) -> Vec<String> {
    line.split(delimiter)
        .map(|field| trim_quotes(field, quote).to_string())
        .collect()
}

pub fn trim_quotes(field: &str, quote: char) -> &str {
    let field = field.strip_prefix(quote).unwrap_or(field);
    field.strip_suffix(quote).unwrap_or(field)
}
