//! Wire types for the chat completions, code completion, embeddings and
//! models endpoints.

use playground_core::{ContentChunk, ModelCapabilities, ModelInfo, Role, Usage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_prompt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// A message as sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

impl WireMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: WireContent::Text(text.into()),
        }
    }

    pub fn chunks(role: Role, chunks: Vec<WireChunk>) -> Self {
        Self {
            role,
            content: WireContent::Chunks(chunks),
        }
    }
}

/// Message content: a bare string or a list of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Chunks(Vec<WireChunk>),
}

impl WireContent {
    /// Chunk list view; a bare string is one text chunk.
    pub fn into_chunks(self) -> Vec<WireChunk> {
        match self {
            Self::Text(text) => vec![WireChunk::Text { text }],
            Self::Chunks(chunks) => chunks,
        }
    }
}

/// One content chunk on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireChunk {
    Text {
        text: String,
    },
    Thinking {
        thinking: Vec<ThinkingBlock>,
    },
    ImageUrl {
        image_url: String,
    },
    InputAudio {
        input_audio: String,
    },
    DocumentUrl {
        document_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        document_name: Option<String>,
    },
    File {
        file_id: String,
    },
}

impl WireChunk {
    /// A thinking chunk carrying one text block.
    pub fn thinking(text: impl Into<String>) -> Self {
        Self::Thinking {
            thinking: vec![ThinkingBlock::Text { text: text.into() }],
        }
    }
}

impl From<&ContentChunk> for WireChunk {
    fn from(chunk: &ContentChunk) -> Self {
        match chunk {
            ContentChunk::Text { text } => Self::Text { text: text.clone() },
            ContentChunk::ImageUrl { image_url } => Self::ImageUrl {
                image_url: image_url.clone(),
            },
            ContentChunk::InputAudio { input_audio } => Self::InputAudio {
                input_audio: input_audio.clone(),
            },
            ContentChunk::DocumentUrl {
                document_url,
                document_name,
            } => Self::DocumentUrl {
                document_url: document_url.clone(),
                document_name: document_name.clone(),
            },
            ContentChunk::File { file_id } => Self::File {
                file_id: file_id.clone(),
            },
        }
    }
}

/// A block inside a thinking chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThinkingBlock {
    Text {
        text: String,
    },

    /// Block kinds this client does not understand.
    #[serde(untagged)]
    Unknown(Value),
}

// ---------------------------------------------------------------------------
// Streaming response
// ---------------------------------------------------------------------------

/// One decoded stream event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

impl CompletionChunk {
    /// Delta of the first choice, the only one a playground request asks for.
    pub fn delta(&self) -> Option<&Delta> {
        self.choices.first().map(|choice| &choice.delta)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<DeltaContent>,
}

/// Delta content: plain text or structured chunks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DeltaContent {
    Text(String),
    Chunks(Vec<StreamChunk>),
}

/// A structured chunk inside a delta.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Text {
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: Vec<ThinkingBlock>,
    },

    /// Unknown chunk type (fallback).
    #[serde(untagged)]
    Unknown(Value),
}

/// Token usage as reported on the final event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<UsageInfo> for Usage {
    fn from(info: UsageInfo) -> Self {
        Usage::new(info.prompt_tokens, info.completion_tokens, info.total_tokens)
    }
}

// ---------------------------------------------------------------------------
// Code completion
// ---------------------------------------------------------------------------

/// Body of `POST /v1/fim/completions`.
///
/// The answer streams in the same chunk shape as a chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FimCompletionRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

impl FimCompletionRequest {
    /// Streaming request with no sampling overrides.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
            suffix: None,
            stop: Vec::new(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            random_seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Body of `POST /v1/embeddings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

/// Answer of `POST /v1/embeddings`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub data: Vec<Embedding>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

/// One input's vector.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Embedding {
    #[serde(default)]
    pub object: Option<String>,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub index: u32,
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Body of `GET /v1/models`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ModelList {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub data: Vec<ModelCard>,
}

/// One model as listed by the endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelCard {
    pub id: String,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub owned_by: Option<String>,
    #[serde(default)]
    pub capabilities: Map<String, Value>,
}

impl ModelCard {
    fn flag(&self, name: &str) -> bool {
        self.capabilities
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Capability record: inferred from the id, widened by what the card declares.
    pub fn to_model_info(&self) -> ModelInfo {
        let inferred = ModelInfo::infer(&self.id);
        let capabilities = ModelCapabilities {
            vision: inferred.capabilities.vision || self.flag("vision"),
            transcribe: inferred.capabilities.transcribe || self.flag("audio_transcription"),
            ..inferred.capabilities
        };
        inferred.with_capabilities(capabilities)
    }
}
