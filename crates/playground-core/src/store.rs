//! Persistence seam for chat sessions.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::{ChatId, ChatState};

/// Storage for complete chat snapshots.
///
/// Implementations must round-trip a [`ChatState`] losslessly: every
/// version, every chunk kind, reasoning text, options and usage.
pub trait ChatStore {
    /// Insert or replace a chat.
    fn save(&mut self, state: &ChatState) -> Result<(), CoreError>;

    fn load(&self, id: &ChatId) -> Result<Option<ChatState>, CoreError>;

    /// All chats, newest first.
    fn list(&self) -> Result<Vec<ChatState>, CoreError>;

    /// Remove a chat. Returns whether it existed.
    fn delete(&mut self, id: &ChatId) -> Result<bool, CoreError>;
}

/// In-memory store. Snapshots are serialized on save so callers observe the
/// same round-trip behavior as a persistent backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chats: HashMap<ChatId, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatStore for MemoryStore {
    fn save(&mut self, state: &ChatState) -> Result<(), CoreError> {
        let json = serde_json::to_string(state)?;
        self.chats.insert(state.id.clone(), json);
        Ok(())
    }

    fn load(&self, id: &ChatId) -> Result<Option<ChatState>, CoreError> {
        self.chats
            .get(id)
            .map(|json| serde_json::from_str(json).map_err(CoreError::from))
            .transpose()
    }

    fn list(&self) -> Result<Vec<ChatState>, CoreError> {
        let mut chats = self
            .chats
            .values()
            .map(|json| serde_json::from_str::<ChatState>(json))
            .collect::<Result<Vec<_>, _>>()?;
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    fn delete(&mut self, id: &ChatId) -> Result<bool, CoreError> {
        Ok(self.chats.remove(id).is_some())
    }
}
