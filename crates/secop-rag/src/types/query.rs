//! Query request types

use serde::{Deserialize, Serialize};

/// Query request against the indexed corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The natural-language question
    pub query: String,

    /// Number of passages to retrieve (server default when absent)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Include the full text of each matched entry in the response (default: false)
    #[serde(default)]
    pub include_full_text: bool,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            include_full_text: false,
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Resolve top_k against the configured default
    pub fn top_k_or(&self, default: usize) -> usize {
        self.top_k.unwrap_or(default)
    }
}
