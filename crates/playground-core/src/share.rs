//! Shareable chat snapshots.
//!
//! A shared chat carries only the active version of each message. The
//! snapshot is serialized to JSON, zlib-compressed and wrapped in URL-safe
//! base64 so it can travel inside a link.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::CoreError;
use crate::ChatState;

/// Copy of `state` reduced to the versions currently on screen.
pub fn share_snapshot(state: &ChatState) -> ChatState {
    let mut snapshot = state.clone();
    snapshot.messages.retain_active_versions();
    snapshot
}

/// Largest snapshot a token may inflate to.
pub const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// Encode a chat as a URL-safe share token.
pub fn encode_share(state: &ChatState) -> Result<String, CoreError> {
    let snapshot = share_snapshot(state);
    let json = serde_json::to_vec(&snapshot)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(serde_json::Error::io)?;
    let compressed = encoder.finish().map_err(serde_json::Error::io)?;

    let token = URL_SAFE_NO_PAD.encode(&compressed);
    debug!(
        chat_id = %state.id,
        json_len = json.len(),
        token_len = token.len(),
        "Encoded share token"
    );
    Ok(token)
}

/// Decode and validate a share token.
pub fn decode_share(token: &str) -> Result<ChatState, CoreError> {
    let compressed = URL_SAFE_NO_PAD
        .decode(token.trim().trim_end_matches('='))
        .map_err(|e| CoreError::InvalidShareToken(e.to_string()))?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_SNAPSHOT_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| CoreError::InvalidShareToken(e.to_string()))?;
    if json.len() as u64 > MAX_SNAPSHOT_BYTES {
        return Err(CoreError::InvalidShareToken(
            "snapshot exceeds size limit".to_string(),
        ));
    }

    let state: ChatState = serde_json::from_slice(&json)
        .map_err(|e| CoreError::InvalidSnapshot(e.to_string()))?;
    Ok(state)
}
