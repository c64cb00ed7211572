//! Generation parameters attached to a chat session.

use serde::{Deserialize, Serialize};

use crate::content::ContentChunk;
use crate::message::Conversation;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "mistral-small-latest";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Generation parameters for one chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    /// Model identifier.
    pub model: String,

    pub temperature: f32,

    pub top_p: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Random seed for reproducible sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Ask the endpoint to inject its safety prompt.
    #[serde(default)]
    pub safe_prompt: bool,

    /// Request a JSON object response.
    #[serde(default)]
    pub json: bool,

    /// The session's single system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: 1.0,
            max_tokens: None,
            frequency_penalty: None,
            presence_penalty: None,
            seed: None,
            safe_prompt: false,
            json: false,
            system_prompt: None,
        }
    }
}

impl ChatOptions {
    /// Create options for a model with default sampling.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Builder method to set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Builder method to toggle JSON mode.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// System prompt if set and non-empty.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|p| !p.is_empty())
    }

    /// Copy every option except the model from `source`.
    ///
    /// Used by comparison mode: one direction only, source to target.
    pub fn sync_from(&mut self, source: &ChatOptions) {
        let model = std::mem::take(&mut self.model);
        *self = ChatOptions {
            model,
            ..source.clone()
        };
    }

    /// Move a leading `system` message out of the conversation into
    /// `system_prompt`. Returns true when a message was migrated.
    ///
    /// An existing non-empty system prompt wins; the message is still removed
    /// so the session ends up with exactly one system prompt.
    pub fn migrate_system_message(&mut self, conversation: &mut Conversation) -> bool {
        let Some(message) = conversation.take_leading_system() else {
            return false;
        };
        if self.system_prompt().is_none() {
            let text: String = message
                .active()
                .content
                .iter()
                .filter_map(ContentChunk::as_text)
                .collect();
            self.system_prompt = Some(text);
        }
        true
    }
}
