//! API error type for the HTTP surface.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use playground_client::{ClientError, ErrorCode};
use thiserror::Error;
use tracing::warn;

use crate::http::responses::ErrorResponse;

/// Errors returned to the browser as `400 {error, message, code}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body did not match the expected shape.
    #[error("Invalid request body: {message}")]
    Parsing { message: String },

    /// The model endpoint rejected or failed the request.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ApiError {
    pub fn from_rejection(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Invalid JSON in request body");
        Self::Parsing {
            message: rejection.body_text(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parsing { .. } => ErrorCode::Parsing,
            Self::Client(e) => e.code(),
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        match self {
            Self::Parsing { message } => ErrorResponse {
                error: "Invalid request body".to_string(),
                message: message.clone(),
                code: ErrorCode::Parsing,
            },
            Self::Client(e) => ErrorResponse::from_client(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self.to_body())).into_response()
    }
}
