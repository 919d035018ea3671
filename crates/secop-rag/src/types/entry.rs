//! Canonical entries and the passages derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical form of one ingested record or document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntry {
    /// Stable identifier, unique across the store
    pub unique_id: String,
    /// Complete serialized source, returned verbatim on lookup
    pub full_text: String,
    /// Short derived text used only to produce vectors
    pub index_text: String,
}

impl CanonicalEntry {
    pub fn new(
        unique_id: impl Into<String>,
        full_text: impl Into<String>,
        index_text: impl Into<String>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            full_text: full_text.into(),
            index_text: index_text.into(),
        }
    }

    /// Whether there is anything to vectorize
    pub fn has_index_text(&self) -> bool {
        !self.index_text.trim().is_empty()
    }
}

/// A passage about to be written; the group and ordinal are assigned by the store call
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    /// Literal chunk content
    pub text: String,
    /// Embedding vector
    pub vector: Vec<f32>,
}

impl Passage {
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector,
        }
    }

    /// Pair chunk texts with their vectors, preserving order
    pub fn zip(texts: Vec<String>, vectors: Vec<Vec<f32>>) -> Vec<Passage> {
        texts
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| Passage { text, vector })
            .collect()
    }
}

/// A passage as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPassage {
    /// Owning entry id
    pub group_id: String,
    /// Zero-based position within the group
    pub ordinal: u32,
    /// Literal chunk content
    pub text: String,
    /// Embedding vector
    pub vector: Vec<f32>,
}

/// Listing row for an entry (no full text)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub unique_id: String,
    pub index_text: String,
    pub passage_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
