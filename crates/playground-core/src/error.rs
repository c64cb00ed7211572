//! Core domain errors.

use thiserror::Error;

/// Errors raised by the message store and its snapshots.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Message not found in the conversation.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Chat not found in the store.
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// Version cursor outside `0..len`.
    #[error("Version index {index} out of range (message has {len} versions)")]
    VersionOutOfRange { index: usize, len: usize },

    /// A message must always keep at least one version.
    #[error("Cannot delete the only version of message {0}")]
    LastVersion(String),

    /// Operation requires a different role.
    #[error("Message {id} has role '{actual}', expected '{expected}'")]
    WrongRole {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A snapshot failed validation.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Share token could not be decoded.
    #[error("Invalid share token: {0}")]
    InvalidShareToken(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}
