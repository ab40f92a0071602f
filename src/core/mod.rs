// Core modules: value model, binary codec, field splitting, ingestion, and inference.
pub mod codec;
pub mod error;
pub mod frame;
pub mod infer;
pub mod ingest;
pub mod split;
pub mod value;
