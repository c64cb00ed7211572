//! Streaming chat client for the playground
//!
//! This crate turns a conversation into a streaming completion request and
//! folds the response back into the answer message:
//! - [`prepare_messages`] / [`build_request`] build the outbound body
//! - [`process_chunk`] applies structured delta chunks
//! - [`ReasoningState`] splits inline `<think>` reasoning from the answer
//! - [`generate_chat_message`] drives one generation end to end
//! - [`CompletionBackend`] also proxies code completion and embeddings
//!
//! # Example
//!
//! ```rust,no_run
//! use playground_client::{ChatClient, ClientConfig, CompletionBackend};
//!
//! async fn list() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChatClient::new(ClientConfig::from_env()?);
//!     for model in client.list_models().await? {
//!         println!("{}", model.id);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod generator;
mod handler;
mod reasoning;
mod reducer;
mod request;
mod sse;
mod types;

// Re-export main types
pub use client::{
    normalize_endpoint, ChatClient, ChunkStream, ClientConfig, CompletionBackend, API_KEY_ENV,
    DEFAULT_ENDPOINT, ENDPOINT_ENV,
};
pub use error::{ClientError, ErrorCode, ErrorDetails};
pub use generator::{format_json_response, generate_chat_message};
pub use handler::{
    BoundedChannelHandler, ChannelHandler, GenerationEvent, GenerationHandler, NoopHandler,
};
pub use reasoning::{ReasoningState, ReasoningStep};
pub use reducer::process_chunk;
pub use request::{build_request, prepare_messages, THINK_CLOSE, THINK_OPEN};
pub use sse::{decode_chunks, SseDecoder, SseEvent, DONE_MARKER};
pub use types::{
    ChatCompletionRequest, ChunkChoice, CompletionChunk, Delta, DeltaContent, Embedding,
    EmbeddingRequest, EmbeddingResponse, FimCompletionRequest, ModelCard, ModelList,
    ResponseFormat, StreamChunk, ThinkingBlock, UsageInfo, WireChunk, WireContent, WireMessage,
};
