//! Purpose: Define the stable public Rust API boundary for csvframe.
//! Exports: Frame descriptor, value model, ingestion and inference entry points, errors.
//! Role: Public, additive-only surface used by the CLI and library callers.
//! Invariants: Everything a caller needs to ingest, scan, and infer is re-exported here.

pub use crate::core::codec::{FrameDecoder, FrameEncoder};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::frame::{Frame, Rows};
pub use crate::core::infer::{
    ColumnProfile, INTEGRAL_CATEGORY_THRESHOLD, InferOptions, InferReport, infer, infer_report,
};
pub use crate::core::ingest::{DEFAULT_HEARTBEAT_ROWS, IngestOptions, ingest_csv, read_header};
pub use crate::core::split::SplitMode;
pub use crate::core::value::{ColumnType, FrameValue, Schema};
