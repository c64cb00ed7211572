//! Typed pieces of message content.

use serde::{Deserialize, Serialize};

/// One typed piece of a message version.
///
/// Text is the only kind the streaming pipeline writes to; the other kinds
/// are references to uploaded media and pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentChunk {
    /// Plain text.
    Text { text: String },

    /// Image, either a URL or a `data:` URI.
    ImageUrl {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },

    /// Base64 encoded audio clip.
    InputAudio {
        #[serde(rename = "inputAudio")]
        input_audio: String,
    },

    /// Remote document.
    DocumentUrl {
        #[serde(rename = "documentUrl")]
        document_url: String,
        #[serde(
            rename = "documentName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        document_name: Option<String>,
    },

    /// File previously uploaded to the endpoint.
    File {
        #[serde(rename = "fileId")]
        file_id: String,
    },
}

impl ContentChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: url.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Text of a text chunk, `None` for media references.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub(crate) fn as_text_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}
