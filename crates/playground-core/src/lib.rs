//! Playground Core Domain Types
//!
//! This crate holds the conversation document model with no dependencies on:
//! - Network or the remote model endpoint
//! - An async runtime
//! - A concrete storage backend
//!
//! Messages are versioned (`versions` plus a validated `index` cursor) so
//! regenerations and edits never overwrite earlier output.

pub mod content;
pub mod error;
pub mod history;
pub mod ids;
pub mod message;
pub mod model;
pub mod options;
pub mod settings;
pub mod share;
pub mod state;
pub mod store;
pub mod usage;

// Re-export commonly used types
pub use content::ContentChunk;
pub use error::CoreError;
pub use history::{group_by_date, DateGroup};
pub use ids::{ChatId, MessageId};
pub use message::{Conversation, Message, Role, Version};
pub use model::{
    ModelCapabilities, ModelCatalog, ModelInfo, ReasoningMode, LEGACY_THINK_TAG_MODEL,
};
pub use options::ChatOptions;
pub use settings::Settings;
pub use share::{decode_share, encode_share, share_snapshot};
pub use state::{ChatState, Comparison};
pub use store::{ChatStore, MemoryStore};
pub use usage::Usage;
