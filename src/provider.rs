//! The completion capability a chat session depends on.
//!
//! [`CompletionProvider`] is the seam between the session and the hosted API:
//! the [`Groq`](crate::Groq) client implements it over HTTP, and tests
//! implement it with scripted chunk sequences.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::types::{ChatCompletionChunk, CompletionRequest};

/// A finite, single-use stream of completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Something that can turn a completion request into a chunk stream.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue `request` once and return the response stream.
    ///
    /// Errors returned here happened before any chunk arrived (rejected
    /// request, connection failure). Errors inside the stream happened after.
    async fn create_completion(&self, request: &CompletionRequest) -> Result<ChunkStream>;
}

#[async_trait::async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<P> {
    async fn create_completion(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        (**self).create_completion(request).await
    }
}
