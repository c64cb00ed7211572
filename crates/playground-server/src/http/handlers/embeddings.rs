//! Embeddings handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use playground_client::EmbeddingResponse;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::http::responses::EmbeddingsRequest;
use crate::state::AppState;

/// POST /api/embeddings - Embed a batch of strings.
pub async fn embeddings(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EmbeddingsRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;
    if req.input.is_empty() {
        return Err(ApiError::Parsing {
            message: "input must contain at least one string".to_string(),
        });
    }

    let backend = state.connect(&req.api_key, req.endpoint.as_deref());
    let request = req.into_wire();
    let inputs = request.input.len();

    let response = backend.embeddings(request).await.map_err(|e| {
        warn!(error = %e, "Failed to embed inputs");
        ApiError::from(e)
    })?;

    info!(inputs, vectors = response.data.len(), "Embedded inputs");
    Ok(Json(response))
}
