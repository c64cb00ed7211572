//! Streaming code completion handler.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::Sse,
    Json,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::completions::{relay_stream, SseEventStream};
use crate::error::ApiError;
use crate::http::responses::FimRequest;
use crate::state::AppState;

/// POST /api/fim/completions - Relay a fill-in-the-middle completion.
///
/// Same event contract as `/api/chat/completions`.
pub async fn fim_completions(
    State(state): State<Arc<AppState>>,
    body: Result<Json<FimRequest>, JsonRejection>,
) -> Result<Sse<SseEventStream>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;

    let backend = state.connect(&req.api_key, req.endpoint.as_deref());
    let request = req.into_wire();
    info!(
        model = %request.model,
        prompt_len = request.prompt.len(),
        has_suffix = request.suffix.is_some(),
        "Received code completion request"
    );

    let cancel = CancellationToken::new();
    let started = Instant::now();
    let chunks = backend.stream_fim(request, cancel.clone()).await?;
    relay_stream(chunks, cancel, started).await
}
