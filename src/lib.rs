//! Purpose: Library crate behind the `csvframe` CLI and integration tests.
//! Exports: `api` (stable surface) and `core` (codec, ingestion, inference, errors).
//! Role: Converts delimited text to fixed-schema binary frames and infers column types.
//! Invariants: Frames are single-owner files; no concurrent writer and reader per file.
//! Invariants: Schema and row count travel outside the frame file, in `Frame`.
pub mod api;
pub mod core;
