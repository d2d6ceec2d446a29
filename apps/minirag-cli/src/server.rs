//! HTTP boundary over a [`RagEngine`].
//!
//! ## Endpoints
//!
//! - `GET /health` - liveness
//! - `POST /ingest` - ingest inline text `{text_content, source?}`
//! - `POST /ingest/file` - ingest the raw request body, named by the `x-filename` header
//! - `POST /query` - answer `{question}` with sources
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use minirag_core::loader;
use minirag_core::types::{ChunkId, Document, IngestReport, QueryOutcome};
use minirag_core::{Error, ErrorKind};
use minirag_core::traits::RagEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn RagEngine>,
}

#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    pub text_content: String,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub chunk_count: usize,
    pub chunk_ids: Vec<ChunkId>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SourceEntry {
    pub source_id: usize,
    pub descriptor: String,
    pub chunk_id: ChunkId,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceEntry>,
    pub no_answer: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upserted: Option<Vec<ChunkId>>,
}

/// Library error rendered as a JSON response with a kind-specific status.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self { Self(e) }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::DocumentLoad => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::Chunking => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::EmbeddingService | ErrorKind::VectorStore | ErrorKind::Rerank | ErrorKind::Generation => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InvalidConfig | ErrorKind::DimensionMismatch => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(kind = ?kind, "request failed: {}", self.0);
        }
        let upserted = match &self.0 {
            Error::PartialIngest { upserted, .. } => Some(upserted.clone()),
            _ => None,
        };
        let body = ErrorBody { error: self.0.to_string(), kind: format!("{kind:?}"), upserted };
        (status, Json(body)).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest_text))
        .route("/ingest/file", post(ingest_file))
        .route("/query", post(query))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> { Json(serde_json::json!({"status": "ok"})) }

fn ingested(report: IngestReport) -> Json<IngestResponse> {
    Json(IngestResponse {
        message: format!("Ingested {} chunks from {}", report.chunk_count, report.source),
        chunk_count: report.chunk_count,
        chunk_ids: report.chunk_ids,
    })
}

async fn ingest_text(State(state): State<AppState>, Json(req): Json<IngestTextRequest>) -> Result<Json<IngestResponse>, ApiError> {
    if req.text_content.trim().is_empty() {
        return Err(Error::InvalidInput("text_content must not be empty".into()).into());
    }
    let source = req.source.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "inline".to_string());
    let report = state.engine.ingest(Document::new(source, req.text_content)).await?;
    Ok(ingested(report))
}

async fn ingest_file(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<IngestResponse>, ApiError> {
    let name = headers
        .get("x-filename")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidInput("x-filename header is required".into()))?
        .to_string();
    if body.is_empty() {
        return Err(Error::InvalidInput(format!("{name} is empty")).into());
    }
    // pdftotext runs as a child process
    let document = tokio::task::spawn_blocking(move || loader::load_bytes(&name, &body))
        .await
        .map_err(|e| Error::DocumentLoad(format!("loader task failed: {e}")))??;
    info!(source = %document.source, bytes = document.text.len(), "received upload");
    let report = state.engine.ingest(document).await?;
    Ok(ingested(report))
}

async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Result<Json<QueryResponse>, ApiError> {
    let outcome = state.engine.query(&req.question).await?;
    let response = match outcome {
        QueryOutcome::Answered(answer) => QueryResponse {
            answer: answer.text,
            sources: answer
                .citations
                .into_iter()
                .map(|c| SourceEntry { source_id: c.source_id, descriptor: c.descriptor.to_string(), chunk_id: c.chunk_id })
                .collect(),
            no_answer: false,
        },
        QueryOutcome::NoAnswerFound => QueryResponse {
            answer: "No answer was found in the ingested documents.".into(),
            sources: Vec::new(),
            no_answer: true,
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_distinguish_failure_classes() {
        assert_eq!(status_for(ErrorKind::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Chunking), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Rerank), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ErrorKind::DimensionMismatch), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
