//! Error types for the playground client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to the model endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API key configured.
    #[error("Missing API key")]
    MissingApiKey,

    /// Transport failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event stream broke its framing.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The request was cancelled before a stream was opened.
    #[error("Request cancelled")]
    Cancelled,

    /// Progress receiver was dropped.
    #[error("Channel closed")]
    ChannelClosed,

    /// The backend does not serve this kind of request.
    #[error("Unsupported request: {0}")]
    Unsupported(&'static str),
}

/// Error codes surfaced by endpoints wrapping the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Invalid or unauthorized credential.
    #[serde(rename = "ERR_API_KEY")]
    ApiKey,
    /// Any other request failure.
    #[serde(rename = "ERR_API_REQ")]
    ApiRequest,
    /// Malformed input to a wrapping endpoint.
    #[serde(rename = "ERR_PARSING")]
    Parsing,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "ERR_API_KEY",
            Self::ApiRequest => "ERR_API_REQ",
            Self::Parsing => "ERR_PARSING",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable rendering of a failed generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetails {
    /// Text shown inline in the conversation.
    pub text: String,

    /// JSON body returned by the endpoint, when one was embedded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ClientError {
    /// HTTP status, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify for callers: credential problems vs. everything else.
    pub fn code(&self) -> ErrorCode {
        match (self, self.status()) {
            (Self::MissingApiKey, _) | (_, Some(401 | 403)) => ErrorCode::ApiKey,
            _ => ErrorCode::ApiRequest,
        }
    }

    /// Short explanation suitable for a banner.
    pub fn user_message(&self) -> &'static str {
        match (self.code(), self.status()) {
            (ErrorCode::ApiKey, _) => "Your API key is invalid.",
            (_, Some(404)) => "The API endpoint was not found, check the endpoint URL.",
            _ => "The API is down or there is a problem with your API key.",
        }
    }

    /// Inline text for the failed turn, splitting out an embedded JSON body.
    pub fn details(&self) -> ErrorDetails {
        let message = self.to_string();
        if let Some(start) = message.find('{') {
            let prefix = message[..start].trim().trim_end_matches('-').trim();
            if !prefix.is_empty() {
                if let Ok(body) = serde_json::from_str::<Value>(message[start..].trim()) {
                    return ErrorDetails {
                        text: format!("Failed to generate: {}", prefix),
                        body: Some(body),
                    };
                }
            }
        }
        ErrorDetails {
            text: format!("Failed to generate: {}", message),
            body: None,
        }
    }
}
