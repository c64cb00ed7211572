//! Model descriptors and capability flags.
//!
//! Branching on model behavior goes through [`ModelInfo::reasoning_mode`]
//! instead of comparing model ids at each call site.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The one model that emits reasoning inline as `<think>...</think>` text.
pub const LEGACY_THINK_TAG_MODEL: &str = "magistral-medium-2506";

/// What a model can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCapabilities {
    /// Produces reasoning text alongside the answer.
    #[serde(default)]
    pub reasoning: bool,

    /// Reasoning arrives as inline `<think>` tags rather than thinking chunks.
    #[serde(default)]
    pub legacy_think_tags: bool,

    /// Accepts audio for transcription.
    #[serde(default)]
    pub transcribe: bool,

    /// Accepts image input.
    #[serde(default)]
    pub vision: bool,
}

/// How reasoning text reaches the client for a given model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningMode {
    /// No reasoning; all text is answer content.
    None,
    /// Reasoning arrives as structured `thinking` chunks.
    Structured,
    /// Reasoning is embedded in plain text between `<think>` tags.
    LegacyTags,
}

/// A model descriptor with its capability record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier as accepted by the endpoint.
    pub id: String,

    #[serde(default)]
    pub capabilities: ModelCapabilities,
}

impl ModelInfo {
    /// Create a model with no special capabilities.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: ModelCapabilities::default(),
        }
    }

    /// Builder method to set capabilities.
    pub fn with_capabilities(mut self, capabilities: ModelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Build a descriptor from the model id's family.
    pub fn infer(id: impl Into<String>) -> Self {
        let id = id.into();
        let family = id.to_ascii_lowercase();
        let capabilities = ModelCapabilities {
            reasoning: family.starts_with("magistral"),
            legacy_think_tags: id == LEGACY_THINK_TAG_MODEL,
            transcribe: family.starts_with("voxtral"),
            vision: family.starts_with("pixtral")
                || family.starts_with("mistral-medium")
                || family.starts_with("mistral-small")
                || family.starts_with("magistral"),
        };
        Self { id, capabilities }
    }

    pub fn is_reasoning(&self) -> bool {
        self.capabilities.reasoning
    }

    /// Dispatch key for reasoning handling.
    pub fn reasoning_mode(&self) -> ReasoningMode {
        match (self.capabilities.reasoning, self.capabilities.legacy_think_tags) {
            (false, _) => ReasoningMode::None,
            (true, false) => ReasoningMode::Structured,
            (true, true) => ReasoningMode::LegacyTags,
        }
    }

    /// Whether the model emits inline `<think>` tags, regardless of whether
    /// reasoning is enabled for this request.
    pub fn uses_legacy_tags(&self) -> bool {
        self.capabilities.legacy_think_tags
    }
}

/// Catalog of known models, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelInfo>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded from a list of ids, with inferred capabilities.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for id in ids {
            catalog.insert(ModelInfo::infer(id));
        }
        catalog
    }

    pub fn insert(&mut self, model: ModelInfo) {
        self.models.insert(model.id.clone(), model);
    }

    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.get(id)
    }

    /// Known descriptor, or one inferred from the id.
    pub fn get_or_infer(&self, id: &str) -> ModelInfo {
        self.get(id).cloned().unwrap_or_else(|| ModelInfo::infer(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
