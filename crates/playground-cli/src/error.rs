//! CLI errors.

use playground_client::ClientError;
use playground_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No saved chat with this id.
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// The chat has nothing to regenerate.
    #[error("Chat {0} has no assistant message to regenerate")]
    NothingToRegenerate(String),

    #[error("Could not determine a data directory; pass --data-dir")]
    NoDataDir,
}
