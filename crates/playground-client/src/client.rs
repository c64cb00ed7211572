//! HTTP client for the completion, embeddings and models endpoints.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::sse::decode_chunks;
use crate::types::{
    ChatCompletionRequest, CompletionChunk, EmbeddingRequest, EmbeddingResponse,
    FimCompletionRequest, ModelCard, ModelList,
};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Environment variable overriding the endpoint.
pub const ENDPOINT_ENV: &str = "PLAYGROUND_ENDPOINT";

/// Stream of decoded completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk, ClientError>> + Send>>;

/// Trim a configured endpoint, falling back to the default and dropping
/// trailing slashes.
pub fn normalize_endpoint(endpoint: Option<&str>) -> String {
    match endpoint.map(str::trim).filter(|e| !e.is_empty()) {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None => DEFAULT_ENDPOINT.to_string(),
    }
}

/// Connection settings for [`ChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub endpoint: String,
}

impl ClientConfig {
    /// Config for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Builder method to set a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: Option<&str>) -> Self {
        self.endpoint = normalize_endpoint(endpoint);
        self
    }

    /// Read `MISTRAL_API_KEY` and `PLAYGROUND_ENDPOINT`.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ClientError::MissingApiKey)?;
        let endpoint = std::env::var(ENDPOINT_ENV).ok();
        Ok(Self::new(api_key).with_endpoint(endpoint.as_deref()))
    }
}

/// Source of streamed completions.
///
/// The HTTP client is the production implementation; tests script chunk
/// sequences through the same seam.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Open a streaming completion. Cancelling `cancel` before the response
    /// headers arrive yields [`ClientError::Cancelled`].
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ClientError>;

    /// Models available to the configured credential.
    async fn list_models(&self) -> Result<Vec<ModelCard>, ClientError>;

    /// Open a streaming fill-in-the-middle code completion.
    async fn stream_fim(
        &self,
        _request: FimCompletionRequest,
        _cancel: CancellationToken,
    ) -> Result<ChunkStream, ClientError> {
        Err(ClientError::Unsupported("code completion"))
    }

    /// Embed each input string.
    async fn embeddings(
        &self,
        _request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, ClientError> {
        Err(ClientError::Unsupported("embeddings"))
    }
}

/// Client for one endpoint and credential.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.endpoint, path)
    }

    /// POST `body` and decode the answer as an event stream.
    async fn open_stream<T>(
        &self,
        path: &str,
        body: &T,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ClientError>
    where
        T: Serialize + Sync,
    {
        let send = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = send => response?,
        };
        let response = check_status(response).await?;

        // Dropping the stream on cancel closes the connection.
        let chunks = decode_chunks(response.bytes_stream()).take_until(cancel.cancelled_owned());
        Ok(Box::pin(chunks))
    }
}

#[async_trait]
impl CompletionBackend for ChatClient {
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ClientError> {
        debug!(model = %request.model, "Opening completion stream");
        self.open_stream("/chat/completions", &request, cancel).await
    }

    async fn list_models(&self) -> Result<Vec<ModelCard>, ClientError> {
        let url = self.url("/models");
        debug!(url = %url, "Listing models");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        let response = check_status(response).await?;
        let list: ModelList = response.json().await?;

        info!(count = list.data.len(), "Fetched model list");
        Ok(list.data)
    }

    async fn stream_fim(
        &self,
        request: FimCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ClientError> {
        debug!(model = %request.model, "Opening code completion stream");
        self.open_stream("/fim/completions", &request, cancel).await
    }

    async fn embeddings(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, ClientError> {
        let url = self.url("/embeddings");
        debug!(
            url = %url,
            model = %request.model,
            inputs = request.input.len(),
            "Requesting embeddings"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let embeddings: EmbeddingResponse = response.json().await?;

        info!(count = embeddings.data.len(), "Fetched embeddings");
        Ok(embeddings)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %message, "Endpoint returned an error");
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
