use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Body of a `chat/completions` request.
///
/// Carries the whole conversation, leading system message included, so the
/// provider sees the full history on every turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// The model identifier.
    pub model: String,

    /// The ordered role/content list.
    pub messages: Vec<Message>,

    /// The maximum number of tokens to generate.
    pub max_tokens: u32,

    /// Whether to stream the response; always true for chat turns.
    pub stream: bool,
}

impl CompletionRequest {
    /// Create a new streaming `CompletionRequest`.
    pub fn new(model: impl Into<String>, messages: Vec<Message>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            stream: true,
        }
    }
}
