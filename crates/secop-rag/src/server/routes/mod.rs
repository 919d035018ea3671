//! API routes for the RAG server

pub mod entries;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for record batches
        .route(
            "/records",
            post(ingest::ingest_records).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route(
            "/documents",
            post(ingest::ingest_document).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/backfill", post(ingest::backfill))
        // Entry management
        .route("/entries", get(entries::list_entries))
        .route(
            "/entries/:id",
            get(entries::get_entry).delete(entries::delete_entry),
        )
        .route("/stats", get(entries::stats))
        // Query
        .route("/query", post(query::query_rag))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "secop-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Semantic retrieval over procurement records and documents",
        "endpoints": {
            "POST /api/records": "Ingest one record or an array of records",
            "POST /api/documents": "Ingest a plain-text document",
            "POST /api/backfill": "Index entries that have no passages",
            "POST /api/query": "Retrieve context and answer a question",
            "GET /api/entries": "List entries (limit, offset)",
            "GET /api/entries/:id": "Get an entry",
            "DELETE /api/entries/:id": "Delete an entry and its passages",
            "GET /api/stats": "Store counters"
        }
    }))
}
