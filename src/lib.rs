// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod provider;
pub mod secrets;
pub mod stream;
pub mod types;

mod sse;

// Re-exports
pub use chat::{ChatSession, Renderer, build_request};
pub use client::Groq;
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use provider::{ChunkStream, CompletionProvider};
pub use stream::{StreamOutcome, consume, text_fragments};
pub use types::*;
