//! Core types for the retrieval engine

pub mod entry;
pub mod query;
pub mod response;

pub use entry::{CanonicalEntry, EntrySummary, Passage, StoredPassage};
pub use query::QueryRequest;
pub use response::{ContextItem, IngestReport, QueryMatch, QueryResponse, StoreStats};
