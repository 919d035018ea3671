//! Ranking and retrieval over the vector store

pub mod ranker;
mod search;

pub use ranker::{cosine_similarity, rank, RankedPassage};
pub use search::Retriever;
