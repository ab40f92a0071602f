//! Purpose: Encode and decode the fixed-schema binary row layout.
//! Exports: `FrameEncoder`, `FrameDecoder`, `NUMBER_LEN`, `MAX_VARINT_LEN`.
//! Role: Leaf codec used by ingestion (encode) and frame scans (decode).
//! Invariants: Rows are the concatenation of one encoded value per schema slot, in order.
//! Invariants: Numeric = 8-byte little-endian f64; binary = 1 byte; categorical = 7-bit
//! varint byte length followed by UTF-8 bytes.
//! Invariants: No header, trailer, or row marker is ever written.
use std::io::{self, Read, Write};

use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::value::{ColumnType, FrameValue, Schema};

pub const NUMBER_LEN: usize = 8;
pub const MAX_VARINT_LEN: usize = 5;

pub struct FrameEncoder<W: Write> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write> FrameEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn write_number(&mut self, value: f64) -> Result<(), Error> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_binary(&mut self, value: bool) -> Result<(), Error> {
        self.write_bytes(&[u8::from(value)])
    }

    pub fn write_category(&mut self, value: &str) -> Result<(), Error> {
        let len = u32::try_from(value.len()).map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("categorical value exceeds u32::MAX bytes")
                .with_offset(self.bytes_written)
        })?;
        let (prefix, prefix_len) = encode_varint(len);
        self.write_bytes(&prefix[..prefix_len])?;
        self.write_bytes(value.as_bytes())
    }

    pub fn write_value(&mut self, value: &FrameValue) -> Result<(), Error> {
        match value {
            FrameValue::Number(number) => self.write_number(*number),
            FrameValue::Binary(flag) => self.write_binary(*flag),
            FrameValue::Category(text) => self.write_category(text),
        }
    }

    /// Writes a full row; the values must already be typed per schema slot.
    pub fn write_row(&mut self, schema: &Schema, row: &[FrameValue]) -> Result<(), Error> {
        if row.len() != schema.len() {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "row has {} values but schema has {} columns",
                row.len(),
                schema.len()
            )));
        }
        for (column, (expected, value)) in schema.iter().zip(row).enumerate() {
            if value.column_type() != *expected {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!(
                        "value of type {} in {expected} column",
                        value.column_type()
                    ))
                    .with_column(column));
            }
            self.write_value(value)?;
        }
        Ok(())
    }

    /// Flushes buffered bytes and hands back the underlying writer.
    pub fn finish(mut self) -> Result<W, Error> {
        self.writer
            .flush()
            .map_err(|err| io_error(err, "failed to flush frame").with_offset(self.bytes_written))?;
        Ok(self.writer)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.writer
            .write_all(bytes)
            .map_err(|err| io_error(err, "failed to write frame").with_offset(self.bytes_written))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

pub struct FrameDecoder<R: Read> {
    reader: R,
    offset: u64,
}

impl<R: Read> FrameDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, offset: 0 }
    }

    /// Byte offset of the next unread value.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn read_row(&mut self, schema: &Schema) -> Result<Vec<FrameValue>, Error> {
        schema
            .iter()
            .enumerate()
            .map(|(column, column_type)| {
                self.read_value(*column_type)
                    .map_err(|err| err.with_column(column))
            })
            .collect()
    }

    pub fn read_value(&mut self, column_type: ColumnType) -> Result<FrameValue, Error> {
        match column_type {
            ColumnType::Numeric => self.read_number().map(FrameValue::Number),
            ColumnType::Categorical => self.read_category().map(FrameValue::Category),
            ColumnType::Binary => self.read_binary().map(FrameValue::Binary),
        }
    }

    pub fn read_number(&mut self) -> Result<f64, Error> {
        let mut buf = [0u8; NUMBER_LEN];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_binary(&mut self) -> Result<bool, Error> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }

    pub fn read_category(&mut self) -> Result<String, Error> {
        let start = self.offset;
        let len = self.read_varint()?;
        let body = self.offset;
        // The prefix is untrusted until the bytes behind it are actually read.
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(u64::from(len))
            .read_to_end(&mut buf)
            .map_err(|err| io_error(err, "failed to read frame").with_offset(self.offset))?;
        self.offset += read as u64;
        if read < len as usize {
            return Err(Error::new(ErrorKind::Truncated)
                .with_message("frame ended before the declared row count")
                .with_offset(body));
        }
        String::from_utf8(buf).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("categorical value is not valid UTF-8")
                .with_offset(start)
                .with_source(err)
        })
    }

    fn read_varint(&mut self) -> Result<u32, Error> {
        let start = self.offset;
        let mut value = 0u32;
        for index in 0..MAX_VARINT_LEN {
            let mut byte = [0u8; 1];
            self.read_exact(&mut byte)?;
            let bits = u32::from(byte[0] & 0x7F);
            if index == MAX_VARINT_LEN - 1 && byte[0] > 0x0F {
                break;
            }
            value |= bits << (7 * index);
            if byte[0] & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::new(ErrorKind::Corrupt)
            .with_message("malformed string length prefix")
            .with_offset(start))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.reader.read_exact(buf).map_err(|err| {
            let message = if err.kind() == io::ErrorKind::UnexpectedEof {
                "frame ended before the declared row count"
            } else {
                "failed to read frame"
            };
            io_error(err, message).with_offset(self.offset)
        })?;
        self.offset += buf.len() as u64;
        Ok(())
    }
}

fn encode_varint(mut value: u32) -> ([u8; MAX_VARINT_LEN], usize) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    while value >= 0x80 {
        buf[len] = (value as u8) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    (buf, len + 1)
}
