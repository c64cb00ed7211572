//! HTTP request and response types.

use playground_client::{
    ClientError, EmbeddingRequest, ErrorCode, FimCompletionRequest, WireContent, WireMessage,
};
use playground_core::options::DEFAULT_MODEL;
use playground_core::{ChatOptions, Role};
use serde::{Deserialize, Serialize};

// ============================================================================
// Model list types
// ============================================================================

/// Request body for `POST /api/models`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsRequest {
    pub api_key: String,

    #[serde(default)]
    pub endpoint: Option<String>,
}

// ============================================================================
// Completion types
// ============================================================================

/// Request body for `POST /api/chat/completions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub api_key: String,

    #[serde(default)]
    pub endpoint: Option<String>,

    pub messages: Vec<InputMessage>,

    #[serde(default)]
    pub options: Option<CompletionOptions>,
}

/// A plain-text message from the browser.
#[derive(Debug, Deserialize)]
pub struct InputMessage {
    #[serde(alias = "type")]
    pub role: Role,
    pub content: String,
}

impl InputMessage {
    pub fn into_wire(self) -> WireMessage {
        WireMessage {
            role: self.role,
            content: WireContent::Text(self.content),
        }
    }
}

/// Sampling options accepted from the browser. Zero means "unset" for
/// `maxTokens` and `randomSeed`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub safe_prompt: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl CompletionOptions {
    pub fn into_chat_options(self) -> ChatOptions {
        let defaults = ChatOptions::default();
        ChatOptions {
            model: self
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            max_tokens: self.max_tokens.filter(|&t| t > 0),
            seed: self.random_seed.filter(|&s| s > 0),
            safe_prompt: self.safe_prompt,
            ..defaults
        }
    }
}

// ============================================================================
// Code completion types
// ============================================================================

/// Model used when a code completion names none.
pub const DEFAULT_FIM_MODEL: &str = "codestral-latest";

/// Request body for `POST /api/fim/completions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FimRequest {
    pub api_key: String,

    #[serde(default)]
    pub endpoint: Option<String>,

    pub prompt: String,

    #[serde(default)]
    pub suffix: Option<String>,

    #[serde(default)]
    pub stop: Vec<String>,

    #[serde(default)]
    pub options: Option<FimOptions>,
}

/// Sampling options for a code completion. Zero means "unset" for
/// `maxTokens` and `randomSeed`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FimOptions {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl FimRequest {
    pub fn into_wire(self) -> FimCompletionRequest {
        let options = self.options.unwrap_or_default();
        let defaults = ChatOptions::default();
        let model = options
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_FIM_MODEL.to_string());

        FimCompletionRequest {
            suffix: self.suffix,
            stop: self.stop,
            temperature: Some(options.temperature.unwrap_or(defaults.temperature)),
            top_p: Some(options.top_p.unwrap_or(defaults.top_p)),
            max_tokens: options.max_tokens.filter(|&t| t > 0),
            random_seed: options.random_seed.filter(|&s| s > 0),
            ..FimCompletionRequest::new(model, self.prompt)
        }
    }
}

// ============================================================================
// Embedding types
// ============================================================================

/// Model used when an embedding request names none.
pub const DEFAULT_EMBEDDING_MODEL: &str = "mistral-embed";

/// Request body for `POST /api/embeddings`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingsRequest {
    pub api_key: String,

    #[serde(default)]
    pub endpoint: Option<String>,

    pub input: Vec<String>,

    #[serde(default)]
    pub options: Option<EmbeddingOptions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmbeddingOptions {
    #[serde(default)]
    pub model: Option<String>,
}

impl EmbeddingsRequest {
    pub fn into_wire(self) -> EmbeddingRequest {
        let model = self
            .options
            .and_then(|o| o.model)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        EmbeddingRequest {
            model,
            input: self.input,
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: ErrorCode,
}

impl ErrorResponse {
    /// Body for a failure reported by the endpoint.
    pub fn from_client(error: &ClientError) -> Self {
        let code = error.code();
        let title = match code {
            ErrorCode::ApiKey => "Invalid API key",
            _ => "Invalid Request",
        };
        let message = match error {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        };
        Self {
            error: title.to_string(),
            message,
            code,
        }
    }
}
