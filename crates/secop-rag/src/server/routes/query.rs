//! Query endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::generation::ContextBundle;
use crate::server::state::AppState;
use crate::types::{QueryMatch, QueryRequest, QueryResponse};

/// Answer returned for a blank question
pub const EMPTY_QUERY_ANSWER: &str = "Por favor, escribe una pregunta.";

/// POST /api/query - Retrieve context and answer from it
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    let query = request.query.trim();

    if query.is_empty() {
        return Ok(Json(QueryResponse {
            matches: Vec::new(),
            answer: EMPTY_QUERY_ANSWER.to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        }));
    }

    let top_k = request.top_k_or(state.config().retrieval.default_top_k);
    tracing::info!(top_k, "Query: \"{}\"", query);

    let items = state.retriever().answer_context(query, top_k).await?;
    let matches = items
        .iter()
        .map(|item| QueryMatch::from_item(item, request.include_full_text))
        .collect();

    let bundle = ContextBundle::new(query, items);
    let answer = state.answerer().generate(query, &bundle).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        matches = bundle.items.len(),
        processing_time_ms,
        "Query answered"
    );

    Ok(Json(QueryResponse {
        matches,
        answer,
        processing_time_ms,
    }))
}
