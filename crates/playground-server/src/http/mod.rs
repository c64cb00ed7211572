//! HTTP server for the playground.
//!
//! Provides endpoints for:
//! - Model listing (`/api/models`)
//! - Streaming chat completions (`/api/chat/completions`)
//! - Streaming code completions (`/api/fim/completions`)
//! - Embeddings (`/api/embeddings`)
//! - Health check (`/health`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

pub use handlers::{chat_completions, embeddings, fim_completions, health_check, list_models};

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // The browser UI may be served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/models", post(handlers::list_models))
        .route("/api/chat/completions", post(handlers::chat_completions))
        .route("/api/fim/completions", post(handlers::fim_completions))
        .route("/api/embeddings", post(handlers::embeddings))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
