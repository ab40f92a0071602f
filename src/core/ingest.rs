//! Purpose: Ingest delimited text into a binary frame plus its `Frame` descriptor.
//! Exports: `IngestOptions`, `ingest_csv`, `ingest_records`, `read_header`, `parse_number`,
//! `parse_binary`, `DEFAULT_HEARTBEAT_ROWS`.
//! Role: Drives the codec encoder from a `RecordSource`; one writer owns the destination.
//! Invariants: Fields pair positionally with schema slots; pairing stops at the shorter side.
//! Invariants: Unparseable numeric fields encode as NaN; binary fields always write one byte.
//! Invariants: Row count equals the number of data records read, regardless of field count.
//! Invariants: Nothing is cleaned up on failure; a partial destination file is left behind.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::core::codec::FrameEncoder;
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::frame::Frame;
use crate::core::split::{NaiveLines, QuotedRecords, RecordSource, SplitMode};
use crate::core::value::{ColumnType, Schema};

pub const DEFAULT_HEARTBEAT_ROWS: u64 = 10_000;

const TRUTHY: &[&str] = &["1", "true", "t", "yes", "y"];

#[derive(Clone, Copy, Debug)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub quote: char,
    pub split: SplitMode,
    pub heartbeat_every: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: '"',
            split: SplitMode::Naive,
            heartbeat_every: DEFAULT_HEARTBEAT_ROWS,
        }
    }
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_split(mut self, split: SplitMode) -> Self {
        self.split = split;
        self
    }

    pub fn with_heartbeat_every(mut self, rows: u64) -> Self {
        self.heartbeat_every = rows;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if !self.delimiter.is_ascii() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("delimiter must be a single ASCII character"));
        }
        if self.split == SplitMode::Quoted && !self.quote.is_ascii() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("quote must be a single ASCII character in quoted mode"));
        }
        Ok(())
    }
}

/// Reads `src`, writes the encoded rows to `dst`, and describes the result.
///
/// The schema length is not checked against the header: extra fields or extra
/// schema slots on any line are dropped silently.
pub fn ingest_csv(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    schema: &Schema,
    options: IngestOptions,
) -> Result<Frame, Error> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    options.validate()?;

    let mut opened = open_source(src, options)?;
    let output = File::create(dst)
        .map_err(|err| io_error(err, "failed to create frame").with_path(dst))?;
    let mut encoder = FrameEncoder::new(BufWriter::new(output));

    let mut source = SourceAt {
        inner: opened.as_mut(),
        path: src,
    };
    let (column_names, count) = ingest_records(&mut source, &mut encoder, schema, options)
        .map_err(|err| match err.path() {
            Some(_) => err,
            None => err.with_path(dst),
        })?;

    let bytes = encoder.bytes_written();
    encoder.finish().map_err(|err| err.with_path(dst))?;
    debug!(rows = count, bytes, path = %dst.display(), "frame written");

    Ok(Frame::new(dst, column_names, schema.clone(), count))
}

/// Reads only the header record of `src`, split the same way ingestion splits it.
pub fn read_header(src: impl AsRef<Path>, options: IngestOptions) -> Result<Vec<String>, Error> {
    let src = src.as_ref();
    options.validate()?;
    let mut source = open_source(src, options)?;
    let header = source.next_record().map_err(|err| err.with_path(src))?;
    Ok(header.unwrap_or_default())
}

fn open_source(src: &Path, options: IngestOptions) -> Result<Box<dyn RecordSource>, Error> {
    let input = File::open(src)
        .map_err(|err| io_error(err, "failed to open source").with_path(src))?;
    let source: Box<dyn RecordSource> = match options.split {
        SplitMode::Naive => Box::new(NaiveLines::new(
            BufReader::new(input),
            options.delimiter,
            options.quote,
        )),
        SplitMode::Quoted => Box::new(QuotedRecords::new(
            input,
            options.delimiter,
            options.quote as u8,
        )),
    };
    Ok(source)
}

/// Tags read failures with the source path; anything else failing mid-ingest is the frame's.
struct SourceAt<'a> {
    inner: &'a mut dyn RecordSource,
    path: &'a Path,
}

impl RecordSource for SourceAt<'_> {
    fn next_record(&mut self) -> Result<Option<Vec<String>>, Error> {
        self.inner
            .next_record()
            .map_err(|err| err.with_path(self.path))
    }
}

/// Core ingestion loop over any record source; returns the header and row count.
pub fn ingest_records<S, W>(
    source: &mut S,
    encoder: &mut FrameEncoder<W>,
    schema: &Schema,
    options: IngestOptions,
) -> Result<(Vec<String>, u64), Error>
where
    S: RecordSource + ?Sized,
    W: Write,
{
    let Some(column_names) = source.next_record()? else {
        return Ok((Vec::new(), 0));
    };

    let mut count = 0u64;
    while let Some(fields) = source.next_record()? {
        for (column, (field, column_type)) in fields.iter().zip(schema.iter()).enumerate() {
            let written = match column_type {
                ColumnType::Numeric => encoder.write_number(parse_number(field)),
                ColumnType::Categorical => encoder.write_category(field),
                ColumnType::Binary => encoder.write_binary(parse_binary(field)),
            };
            written.map_err(|err| err.with_row(count).with_column(column))?;
        }

        count += 1;
        if options.heartbeat_every > 0 && count % options.heartbeat_every == 0 {
            info!(stage = "ingest", rows = count, "progress");
        }
    }

    Ok((column_names, count))
}

/// Lenient float parse: surrounding whitespace is ignored and failures become NaN.
pub fn parse_number(field: &str) -> f64 {
    field.trim().parse::<f64>().unwrap_or(f64::NAN)
}

pub fn parse_binary(field: &str) -> bool {
    let token = field.trim();
    TRUTHY.iter().any(|truthy| token.eq_ignore_ascii_case(truthy))
}
