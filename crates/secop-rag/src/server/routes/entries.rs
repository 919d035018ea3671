//! Entry browsing and deletion endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{CanonicalEntry, EntrySummary, StoreStats};

/// Query parameters for listing entries
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub entries: Vec<EntrySummary>,
    /// Total count (before pagination)
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// GET /api/entries - Page through entries, newest first
pub async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<ListEntriesQuery>,
) -> Result<Json<EntryListResponse>> {
    let (limit, offset) = (params.limit.min(1000), params.offset);
    let (entries, total) = state
        .store()
        .run(move |store| Ok((store.list_entries(limit, offset)?, store.count_entries()?)))
        .await?;

    Ok(Json(EntryListResponse {
        entries,
        total,
        limit,
        offset,
    }))
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    #[serde(flatten)]
    pub entry: CanonicalEntry,
    pub passages: usize,
}

/// GET /api/entries/:id - Full entry
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntryResponse>> {
    let lookup = id.clone();
    let found = state
        .store()
        .run(move |store| {
            let entry = store.get_entry(&lookup)?;
            let passages = store.passage_count(&lookup)?;
            Ok(entry.map(|entry| EntryResponse { entry, passages }))
        })
        .await?;

    found
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("entry {}", id)))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: String,
}

/// DELETE /api/entries/:id - Remove an entry and its passages
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = id.clone();
    let deleted = state
        .store()
        .run(move |store| store.delete_entry(&target))
        .await?;

    if !deleted {
        return Err(Error::not_found(format!("entry {}", id)));
    }

    tracing::info!(unique_id = %id, "Entry deleted");
    Ok(Json(DeleteResponse { deleted: id }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub store: StoreStats,
    pub provider: String,
    pub uptime_secs: u64,
}

/// GET /api/stats - Store counters
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let store = state.store().run(|store| store.stats()).await?;
    Ok(Json(StatsResponse {
        store,
        provider: state.retriever().vectorizer().provider_name().to_string(),
        uptime_secs: state.uptime_secs(),
    }))
}
