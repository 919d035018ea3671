//! Ingestion pipeline: canonicalize records, chunk text, index passages

pub mod canonical;
mod chunker;
mod processor;

pub use canonical::{CanonicalSchema, Canonicalizer, FieldGroup, Record};
pub use chunker::{collapse_whitespace, TextChunker};
pub use processor::{load_records_file, Ingestor};
