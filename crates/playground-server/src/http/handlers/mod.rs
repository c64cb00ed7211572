//! HTTP request handlers.

mod completions;
mod embeddings;
mod fim;
mod health;
mod models;

pub use completions::chat_completions;
pub use embeddings::embeddings;
pub use fim::fim_completions;
pub use health::health_check;
pub use models::list_models;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::response::{sse::Sse, IntoResponse};
    use futures_util::stream;
    use playground_client::{
        ChatCompletionRequest, ChunkStream, ClientConfig, ClientError, CompletionBackend,
        CompletionChunk, EmbeddingRequest, EmbeddingResponse, FimCompletionRequest, ModelCard,
    };
    use tokio_util::sync::CancellationToken;

    use super::completions::SseEventStream;
    use crate::config::ServerConfig;
    use crate::state::AppState;

    /// Backend with canned responses that records what it was asked.
    #[derive(Default)]
    pub struct FakeBackend {
        pub chunks: Mutex<Vec<Result<CompletionChunk, ClientError>>>,
        pub open_error: Mutex<Option<ClientError>>,
        pub models: Vec<ModelCard>,
        pub embedding: EmbeddingResponse,
        pub requests: Mutex<Vec<ChatCompletionRequest>>,
        pub fim_requests: Mutex<Vec<FimCompletionRequest>>,
        pub embedding_requests: Mutex<Vec<EmbeddingRequest>>,
    }

    impl FakeBackend {
        fn open(&self) -> Result<ChunkStream, ClientError> {
            if let Some(error) = self.open_error.lock().unwrap().take() {
                return Err(error);
            }
            let chunks = std::mem::take(&mut *self.chunks.lock().unwrap());
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeBackend {
        async fn stream_chat(
            &self,
            request: ChatCompletionRequest,
            _cancel: CancellationToken,
        ) -> Result<ChunkStream, ClientError> {
            self.requests.lock().unwrap().push(request);
            self.open()
        }

        async fn list_models(&self) -> Result<Vec<ModelCard>, ClientError> {
            if let Some(error) = self.open_error.lock().unwrap().take() {
                return Err(error);
            }
            Ok(self.models.clone())
        }

        async fn stream_fim(
            &self,
            request: FimCompletionRequest,
            _cancel: CancellationToken,
        ) -> Result<ChunkStream, ClientError> {
            self.fim_requests.lock().unwrap().push(request);
            self.open()
        }

        async fn embeddings(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, ClientError> {
            self.embedding_requests.lock().unwrap().push(request);
            if let Some(error) = self.open_error.lock().unwrap().take() {
                return Err(error);
            }
            Ok(self.embedding.clone())
        }
    }

    /// State whose connector always hands out `backend`, recording configs.
    pub fn state_with(
        backend: Arc<FakeBackend>,
        config: ServerConfig,
    ) -> (Arc<AppState>, Arc<Mutex<Vec<ClientConfig>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let state = AppState::with_connector(config, move |client_config| {
            recorder.lock().unwrap().push(client_config);
            backend.clone() as Arc<dyn CompletionBackend>
        });
        (state, seen)
    }

    /// Collect an SSE response body.
    pub async fn body_text(sse: Sse<SseEventStream>) -> String {
        let bytes = axum::body::to_bytes(sse.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
