//! secop-rag: Semantic indexing and retrieval over procurement records and documents
//!
//! Records and plain-text documents are canonicalized, split into overlapping
//! passages and vectorized (through an OpenAI-compatible provider or a
//! deterministic hash-seeded fallback). Passages live in SQLite and are ranked
//! by cosine similarity against a query to build a grounded context bundle.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    entry::{CanonicalEntry, Passage, StoredPassage},
    query::QueryRequest,
    response::{ContextItem, IngestReport, QueryResponse, StoreStats},
};
