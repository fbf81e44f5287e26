use serde::{Deserialize, Serialize};

use crate::types::{MessageRole, Usage};

/// One `chat.completion.chunk` object from a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    /// Completion identifier shared by every chunk of a response.
    #[serde(default)]
    pub id: String,

    /// The model that produced the chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Incremental choices; chat turns only ever request one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Usage, when the provider reports it inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Groq's vendor extension, which carries usage on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_groq: Option<GroqExtension>,
}

/// A single choice inside a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    /// Index of the choice.
    #[serde(default)]
    pub index: u32,

    /// The incremental change for this choice.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Set on the last chunk of the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The incremental content of a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkDelta {
    /// Present on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,

    /// The text fragment, absent on control-only chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// The `x_groq` object attached to chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroqExtension {
    /// Request identifier assigned by Groq.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Usage for the whole response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Create a chunk carrying a single text fragment.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    role: None,
                    content: Some(content.into()),
                },
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// Create a chunk with no content, such as a role preamble or a finish marker.
    pub fn control() -> Self {
        Self {
            choices: vec![ChunkChoice::default()],
            ..Self::default()
        }
    }

    /// Returns the first choice's fragment when it is non-empty.
    pub fn fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }

    /// Returns usage from either the standard field or the Groq extension.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
            .or_else(|| self.x_groq.as_ref().and_then(|x| x.usage))
    }
}
