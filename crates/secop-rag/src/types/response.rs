//! Response types for retrieval and ingestion

use serde::{Deserialize, Serialize};

/// One ranked passage resolved back to its owning entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Owning entry id
    pub group_id: String,
    /// Position of the matched passage within its group
    pub ordinal: u32,
    /// Cosine similarity to the query
    pub score: f32,
    /// The matched passage text
    pub matched_text: String,
    /// Full text of the owning entry; absent if the entry is gone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
}

/// Match as returned over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub group_id: String,
    pub ordinal: u32,
    pub score: f32,
    /// First 600 characters of the matched passage
    pub text_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
}

impl QueryMatch {
    const PREVIEW_CHARS: usize = 600;

    pub fn from_item(item: &ContextItem, include_full_text: bool) -> Self {
        Self {
            group_id: item.group_id.clone(),
            ordinal: item.ordinal,
            score: item.score,
            text_preview: item.matched_text.chars().take(Self::PREVIEW_CHARS).collect(),
            full_text: if include_full_text {
                item.full_text.clone()
            } else {
                None
            },
        }
    }
}

/// Query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Ranked matches, best first
    pub matches: Vec<QueryMatch>,
    /// Answer produced from the matches
    pub answer: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Outcome of a record ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records handed to the run
    pub received: usize,
    /// Entries upserted
    pub entries_written: usize,
    /// Passages written across all entries
    pub passages_written: usize,
    /// Entries stored without passages because their index text was blank
    pub skipped_empty: usize,
    /// Records that failed and were left out
    pub failed: usize,
}

/// Store counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total entries
    pub entries: usize,
    /// Entries owning at least one passage
    pub entries_with_passages: usize,
    /// Total passages
    pub passages: usize,
    /// Stamped vector dimensionality
    pub dimensions: usize,
}
