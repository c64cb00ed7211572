//! Folding structured delta chunks into the answer version.

use playground_core::Version;
use tracing::{debug, warn};

use crate::types::{StreamChunk, ThinkingBlock};

/// Apply one structured chunk at position `index` of its delta.
///
/// Text is appended to the answer's text chunk at the same position; when
/// that slot is not a text chunk (a delta that leads with thinking), it goes
/// to the first text chunk instead. Thinking text is appended to the
/// version's reasoning. Unknown chunk kinds are logged and skipped.
pub fn process_chunk(chunk: &StreamChunk, answer: &mut Version, index: usize) {
    match chunk {
        StreamChunk::Text { text } => match answer.text_at_mut(index) {
            Some(slot) => slot.push_str(text),
            None => {
                debug!(index, "No text slot at chunk position, using first text chunk");
                answer.append_text(text);
            }
        },
        StreamChunk::Thinking { thinking } => {
            let reasoning = answer.thinking.get_or_insert_with(String::new);
            for block in thinking {
                match block {
                    ThinkingBlock::Text { text } => reasoning.push_str(text),
                    ThinkingBlock::Unknown(value) => {
                        warn!(block = %value, "Unsupported thinking block");
                    }
                }
            }
        }
        StreamChunk::Unknown(value) => {
            warn!(chunk = %value, "Unsupported chunk content");
        }
    }
}
