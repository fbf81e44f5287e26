// Public modules
pub mod chunk;
pub mod message;
pub mod model;
pub mod request;
pub mod system_prompt;
pub mod usage;

// Re-exports
pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, GroqExtension};
pub use message::{Message, MessageRole};
pub use model::{KnownModel, MAX_TOKENS_STEP, MIN_MAX_TOKENS, ModelSpec, PREFERRED_MAX_TOKENS};
pub use request::CompletionRequest;
pub use system_prompt::SYSTEM_PROMPT;
pub use usage::Usage;
