//! Chat persistence as one JSON file per chat.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use playground_core::{ChatId, ChatState, ChatStore, CoreError};
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// Stores each chat as `<dir>/<chat id>.json`.
///
/// Writes go through a temporary file and a rename so a crash never leaves
/// a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| storage_error(&dir, e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &ChatId) -> Result<PathBuf, CoreError> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CoreError::Storage(format!("Invalid chat id: {id}")));
        }
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }
}

impl ChatStore for JsonFileStore {
    fn save(&mut self, state: &ChatState) -> Result<(), CoreError> {
        let path = self.path_for(&state.id)?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, json).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_error(&path, e))?;
        debug!(chat_id = %state.id, path = %path.display(), "Saved chat");
        Ok(())
    }

    fn load(&self, id: &ChatId) -> Result<Option<ChatState>, CoreError> {
        let path = self.path_for(id)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&path, e)),
        };
        let state: ChatState = serde_json::from_slice(&bytes)?;
        Ok(Some(state))
    }

    fn list(&self) -> Result<Vec<ChatState>, CoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| storage_error(&self.dir, e))?;

        let mut chats = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| storage_error(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<ChatState>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(chat) => chats.push(chat),
                // One corrupt file should not hide the rest of the history
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable chat"),
            }
        }

        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    fn delete(&mut self, id: &ChatId) -> Result<bool, CoreError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error(&path, e)),
        }
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> CoreError {
    CoreError::Storage(format!("{}: {}", path.display(), e))
}
