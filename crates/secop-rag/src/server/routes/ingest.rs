//! Record and document ingestion endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IngestReport;

/// POST /api/records - Ingest one record or an array of records
pub async fn ingest_records(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<IngestReport>> {
    let records = match body {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => {
            return Err(Error::config(
                "request body must be a JSON object or an array of objects",
            ))
        }
    };

    tracing::info!("Ingesting {} records", records.len());
    let report = state.ingestor().ingest_records(&records).await?;
    Ok(Json(report))
}

/// Free-text document upload
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    /// Document id; a random one is assigned when absent
    #[serde(default)]
    pub document_id: Option<String>,
    /// Plain-text body
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub document_id: String,
    pub passages: usize,
}

/// POST /api/documents - Ingest a plain-text document
pub async fn ingest_document(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<DocumentResponse>> {
    let document_id = request
        .document_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let passages = state
        .ingestor()
        .ingest_document(&document_id, &request.text)
        .await?;

    Ok(Json(DocumentResponse {
        document_id: document_id.trim().to_string(),
        passages,
    }))
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub passages_written: usize,
}

/// POST /api/backfill - Index every entry that has no passages yet
pub async fn backfill(State(state): State<AppState>) -> Result<Json<BackfillResponse>> {
    let passages_written = state.ingestor().backfill_passages().await?;
    Ok(Json(BackfillResponse { passages_written }))
}
