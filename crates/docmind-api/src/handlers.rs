//! Route handlers.
//!
//! Every protected handler takes the caller's owner from [`OwnerContext`];
//! request bodies and query strings never carry an owner id.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docmind_core::types::{DocumentId, SearchHit};

use crate::auth::OwnerContext;
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentResponse {
    pub document_id: String,
    pub chunk_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

impl SearchParams {
    fn required_query(self) -> Result<String, ApiError> {
        self.query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("'query' parameter is required".into()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub collection: String,
}

// =============================================================================
// Documents
// =============================================================================

/// POST /documents - ingest a document under a fresh id.
pub async fn create_document(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Json(body): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<CreateDocumentResponse>), ApiError> {
    let document_id = DocumentId::generate();
    let report = state
        .ingestion
        .add_document(&document_id, &owner, &body.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDocumentResponse {
            document_id: report.document_id.to_string(),
            chunk_count: report.chunk_count,
        }),
    ))
}

/// GET /documents/search?query= - nearest passages for the caller.
pub async fn search_documents(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.required_query()?;
    let results = state.query.search(&query, &owner).await?;
    debug!(owner_id = %owner, hits = results.len(), "Search served");

    Ok(Json(SearchResponse {
        total_count: results.len(),
        results,
    }))
}

/// GET /documents/search-ai?query= - agent answer over the caller's documents.
pub async fn search_ai(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<AgentResponse>, ApiError> {
    let query = params.required_query()?;
    let agent = state
        .agent
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Agent is disabled".into()))?;

    let response = agent.answer(&query, &owner).await?;
    Ok(Json(AgentResponse { response }))
}

/// DELETE /documents/{id} - remove all of the caller's points for a document.
pub async fn delete_document(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let document_id = DocumentId::new(id)?;
    state.ingestion.delete_document(&document_id, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness, no auth.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        collection: state.collection.clone(),
    })
}
