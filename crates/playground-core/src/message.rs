//! Versioned conversation messages.
//!
//! A [`Message`] is an append-only log of [`Version`]s with a cursor (`index`)
//! selecting the active one. Every mutation keeps `index < versions.len()`,
//! and deserialization rejects snapshots that break it.

use serde::{Deserialize, Serialize};

use crate::content::ContentChunk;
use crate::error::CoreError;
use crate::ids::MessageId;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// Human input.
    User,
    /// Model output.
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete rendering of a message's content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Ordered content chunks.
    pub content: Vec<ContentChunk>,

    /// Reasoning text, only set for generations from reasoning models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl Version {
    pub fn new(content: Vec<ContentChunk>) -> Self {
        Self {
            content,
            thinking: None,
        }
    }

    /// A version holding a single text chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentChunk::text(text)])
    }

    /// The shape a generation starts from: one empty text slot to stream into.
    pub fn empty_answer() -> Self {
        Self::text("")
    }

    /// Mutable text of the first text chunk, if any.
    pub fn first_text_mut(&mut self) -> Option<&mut String> {
        self.content.iter_mut().find_map(ContentChunk::as_text_mut)
    }

    /// Mutable text of the chunk at `index`, if it is a text chunk.
    pub fn text_at_mut(&mut self, index: usize) -> Option<&mut String> {
        self.content.get_mut(index).and_then(ContentChunk::as_text_mut)
    }

    /// Append to the first text chunk, creating one at the end when the
    /// version only holds media references.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.first_text_mut() {
            Some(existing) => existing.push_str(text),
            None => self.content.push(ContentChunk::text(text)),
        }
    }

    /// Concatenated text of all text chunks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentChunk::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Whether non-empty reasoning text is attached.
    pub fn has_thinking(&self) -> bool {
        self.thinking.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    id: MessageId,
    role: Role,
    versions: Vec<Version>,
    index: usize,
}

/// Unvalidated on-disk shape of a [`Message`].
#[derive(Deserialize)]
struct RawMessage {
    id: MessageId,
    role: Role,
    versions: Vec<Version>,
    index: usize,
}

impl TryFrom<RawMessage> for Message {
    type Error = CoreError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        if raw.index >= raw.versions.len() {
            return Err(CoreError::VersionOutOfRange {
                index: raw.index,
                len: raw.versions.len(),
            });
        }
        Ok(Self {
            id: raw.id,
            role: raw.role,
            versions: raw.versions,
            index: raw.index,
        })
    }
}

impl Message {
    /// Create a message with a single version.
    pub fn new(role: Role, version: Version) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            versions: vec![version],
            index: 0,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Version::text(text))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Version::text(text))
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Version::text(text))
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Number of versions (always at least one).
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Never true for a valid message.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The version currently selected for rendering and export.
    pub fn active(&self) -> &Version {
        &self.versions[self.index]
    }

    pub fn active_mut(&mut self) -> &mut Version {
        &mut self.versions[self.index]
    }

    /// Append a version and make it active.
    pub fn push_version(&mut self, version: Version) -> &mut Version {
        self.versions.push(version);
        self.index = self.versions.len() - 1;
        &mut self.versions[self.index]
    }

    pub fn select_version(&mut self, index: usize) -> Result<(), CoreError> {
        if index >= self.versions.len() {
            return Err(CoreError::VersionOutOfRange {
                index,
                len: self.versions.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    /// Step the cursor back. Returns false when already at the first version.
    pub fn previous_version(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step the cursor forward. Returns false when already at the last version.
    pub fn next_version(&mut self) -> bool {
        if self.index + 1 >= self.versions.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Remove one version, keeping the cursor in range.
    ///
    /// The cursor stays on the same version when an earlier one is removed,
    /// and moves to the previous neighbour when the active one is removed
    /// (the first version hands over to its successor).
    pub fn delete_version(&mut self, index: usize) -> Result<Version, CoreError> {
        if index >= self.versions.len() {
            return Err(CoreError::VersionOutOfRange {
                index,
                len: self.versions.len(),
            });
        }
        if self.versions.len() == 1 {
            return Err(CoreError::LastVersion(self.id.to_string()));
        }

        let removed = self.versions.remove(index);
        if index < self.index || (index == self.index && self.index > 0) {
            self.index -= 1;
        }
        Ok(removed)
    }

    /// Keep only the active version (index becomes 0).
    pub fn retain_active(&mut self) {
        let active = self.versions.swap_remove(self.index);
        self.versions = vec![active];
        self.index = 0;
    }

    fn expect_role(&self, expected: Role) -> Result<(), CoreError> {
        if self.role != expected {
            return Err(CoreError::WrongRole {
                id: self.id.to_string(),
                expected: expected.as_str(),
                actual: self.role.as_str(),
            });
        }
        Ok(())
    }
}

/// Ordered sequence of messages forming one chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn push(&mut self, message: Message) -> &mut Message {
        self.messages.push(message);
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id() == id)
    }

    fn require(&self, id: &MessageId) -> Result<usize, CoreError> {
        self.position(id)
            .ok_or_else(|| CoreError::MessageNotFound(id.to_string()))
    }

    fn require_mut(&mut self, id: &MessageId) -> Result<&mut Message, CoreError> {
        let pos = self.require(id)?;
        Ok(&mut self.messages[pos])
    }

    /// Swap a message with its predecessor. Returns false at the top.
    pub fn move_up(&mut self, id: &MessageId) -> Result<bool, CoreError> {
        let pos = self.require(id)?;
        if pos == 0 {
            return Ok(false);
        }
        self.messages.swap(pos - 1, pos);
        Ok(true)
    }

    /// Swap a message with its successor. Returns false at the bottom.
    pub fn move_down(&mut self, id: &MessageId) -> Result<bool, CoreError> {
        let pos = self.require(id)?;
        if pos + 1 >= self.messages.len() {
            return Ok(false);
        }
        self.messages.swap(pos, pos + 1);
        Ok(true)
    }

    pub fn previous_version(&mut self, id: &MessageId) -> Result<bool, CoreError> {
        Ok(self.require_mut(id)?.previous_version())
    }

    pub fn next_version(&mut self, id: &MessageId) -> Result<bool, CoreError> {
        Ok(self.require_mut(id)?.next_version())
    }

    /// Delete the active version of a message.
    pub fn delete_version(&mut self, id: &MessageId) -> Result<Version, CoreError> {
        let message = self.require_mut(id)?;
        let index = message.index();
        message.delete_version(index)
    }

    /// Record an edit as a new active version.
    pub fn update_message(
        &mut self,
        id: &MessageId,
        content: Vec<ContentChunk>,
    ) -> Result<(), CoreError> {
        self.require_mut(id)?.push_version(Version::new(content));
        Ok(())
    }

    pub fn delete_message(&mut self, id: &MessageId) -> Result<Message, CoreError> {
        let pos = self.require(id)?;
        Ok(self.messages.remove(pos))
    }

    /// Append an assistant message ready to receive a stream.
    ///
    /// Returns the preceding history and the new answer as disjoint borrows.
    pub fn begin_answer(&mut self) -> (&mut [Message], &mut Message) {
        self.messages
            .push(Message::new(Role::Assistant, Version::empty_answer()));
        let last = self.messages.len() - 1;
        let (history, rest) = self.messages.split_at_mut(last);
        (history, &mut rest[0])
    }

    /// Push a fresh answer version onto an existing assistant message.
    ///
    /// The history handed back stops before the regenerated message; anything
    /// after it is not sent to the model.
    pub fn begin_regeneration(
        &mut self,
        id: &MessageId,
    ) -> Result<(&mut [Message], &mut Message), CoreError> {
        let pos = self.require(id)?;
        self.messages[pos].expect_role(Role::Assistant)?;
        self.messages[pos].push_version(Version::empty_answer());
        let (history, rest) = self.messages.split_at_mut(pos);
        Ok((history, &mut rest[0]))
    }

    /// Remove and return a leading system message, if present.
    pub(crate) fn take_leading_system(&mut self) -> Option<Message> {
        match self.messages.first() {
            Some(first) if first.role() == Role::System => Some(self.messages.remove(0)),
            _ => None,
        }
    }

    /// Reduce every message to its active version.
    pub fn retain_active_versions(&mut self) {
        for message in &mut self.messages {
            message.retain_active();
        }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
