//! Model list handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use playground_client::ModelCard;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::http::responses::ModelsRequest;
use crate::state::AppState;

/// POST /api/models - List the models available to a credential.
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ModelsRequest>, JsonRejection>,
) -> Result<Json<Vec<ModelCard>>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;

    let backend = state.connect(&req.api_key, req.endpoint.as_deref());
    let models = backend.list_models().await.map_err(|e| {
        warn!(error = %e, "Failed to list models");
        ApiError::from(e)
    })?;

    info!(count = models.len(), "Listed models");
    Ok(Json(models))
}
