//! Chat sessions and side-by-side comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatId, ChatOptions, Conversation, Usage};

/// A persisted chat session: the full message store plus its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    /// Unique chat identifier.
    pub id: ChatId,

    /// Versioned message history.
    pub messages: Conversation,

    /// Usage of the most recent generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    pub options: ChatOptions,

    /// When the chat was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatState {
    /// Create an empty chat.
    pub fn new(options: ChatOptions) -> Self {
        Self {
            id: ChatId::generate(),
            messages: Conversation::new(),
            usage: None,
            options,
            created_at: Utc::now(),
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: ChatId) -> Self {
        self.id = id;
        self
    }

    /// Clear everything and start over as a brand new chat.
    pub fn reset(&mut self, options: ChatOptions) {
        *self = Self::new(options);
    }

    /// Keep the content but detach it from the original: new id and timestamp.
    pub fn as_new_chat(&mut self) {
        self.id = ChatId::generate();
        self.created_at = Utc::now();
    }

    /// Store the usage of the latest generation.
    pub fn record_usage(&mut self, usage: Usage) {
        self.usage = Some(usage);
    }

    /// Text of the first user message, for titles and listings.
    pub fn title(&self) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.role() == crate::Role::User)
            .map(|m| m.active().text_content())
            .filter(|t| !t.trim().is_empty())
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(ChatOptions::default())
    }
}

/// Two independent chats run side by side.
///
/// The sides share nothing except an explicit [`Comparison::sync_options`]
/// copy from A to B.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub chat_a: ChatState,
    pub chat_b: ChatState,

    /// Mirror option changes from A onto B.
    pub sync_options: bool,
}

impl Comparison {
    pub fn new(options: ChatOptions) -> Self {
        Self {
            chat_a: ChatState::new(options.clone()),
            chat_b: ChatState::new(options),
            sync_options: true,
        }
    }

    /// Seed both sides from an existing chat, as new chats.
    pub fn setup(&mut self, source: &ChatState) {
        for side in [&mut self.chat_a, &mut self.chat_b] {
            *side = source.clone();
            side.as_new_chat();
        }
    }

    /// Copy all options except the model from A to B, if enabled.
    pub fn sync_options(&mut self) {
        if !self.sync_options {
            return;
        }
        self.chat_b.options.sync_from(&self.chat_a.options);
    }

    pub fn reset(&mut self, options: ChatOptions) {
        self.chat_a.reset(options.clone());
        self.chat_b.reset(options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    #[test]
    fn test_as_new_chat_keeps_content() {
        let mut chat = ChatState::default();
        chat.messages.push(Message::user("hello"));
        let old_id = chat.id.clone();

        chat.as_new_chat();
        assert_ne!(chat.id, old_id);
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.title().as_deref(), Some("hello"));
    }

    #[test]
    fn test_comparison_setup_detaches_sides() {
        let mut source = ChatState::default();
        source.messages.push(Message::user("compare me"));

        let mut comparison = Comparison::new(ChatOptions::default());
        comparison.setup(&source);

        assert_ne!(comparison.chat_a.id, source.id);
        assert_ne!(comparison.chat_a.id, comparison.chat_b.id);
        assert_eq!(comparison.chat_b.messages, source.messages);
    }

    #[test]
    fn test_comparison_sync_is_one_way() {
        let mut comparison = Comparison::new(ChatOptions::default());
        comparison.chat_b.options.model = "mistral-large-latest".into();
        comparison.chat_a.options.temperature = 0.1;
        comparison.chat_b.options.temperature = 0.9;

        comparison.sync_options();
        assert_eq!(comparison.chat_b.options.temperature, 0.1);
        assert_eq!(comparison.chat_b.options.model, "mistral-large-latest");

        comparison.chat_b.options.temperature = 0.5;
        comparison.sync_options();
        assert_eq!(comparison.chat_a.options.temperature, 0.1);
    }

    #[test]
    fn test_sync_disabled() {
        let mut comparison = Comparison::new(ChatOptions::default());
        comparison.sync_options = false;
        comparison.chat_a.options.json = true;
        comparison.sync_options();
        assert!(!comparison.chat_b.options.json);
    }
}
