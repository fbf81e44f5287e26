//! Consumption of completion streams.
//!
//! A response arrives as a finite sequence of chunks. [`text_fragments`]
//! narrows it to the non-empty text pieces, and [`consume`] pulls them one at
//! a time, hands each to a [`Renderer`], and returns the accumulated reply.

use futures::{Stream, StreamExt, pin_mut};

use crate::chat::Renderer;
use crate::error::Result;
use crate::observability::{STREAM_CHUNKS, STREAM_FRAGMENTS};
use crate::types::{ChatCompletionChunk, Usage};

/// The result of draining one response stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Every fragment, concatenated in arrival order.
    pub text: String,
    /// Usage reported by the provider, if any chunk carried it.
    pub usage: Option<Usage>,
    /// Number of chunks received, including control-only chunks.
    pub chunk_count: u64,
}

/// Maps a chunk stream to its non-empty text fragments.
///
/// Control-only chunks are dropped; errors pass through unchanged.
///
/// ```
/// use dataeng_chat::{ChatCompletionChunk, text_fragments};
/// use futures::{StreamExt, stream};
///
/// # tokio_test::block_on(async {
/// let chunks = stream::iter(vec![
///     Ok(ChatCompletionChunk::text("Sp")),
///     Ok(ChatCompletionChunk::control()),
///     Ok(ChatCompletionChunk::text("ark")),
/// ]);
/// let fragments: Vec<String> = text_fragments(chunks)
///     .map(|fragment| fragment.unwrap())
///     .collect()
///     .await;
/// assert_eq!(fragments, vec!["Sp", "ark"]);
/// # });
/// ```
pub fn text_fragments<S>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<ChatCompletionChunk>>,
{
    chunks.filter_map(|item| async move {
        match item {
            Ok(chunk) => chunk.fragment().map(|fragment| Ok(fragment.to_string())),
            Err(err) => Some(Err(err)),
        }
    })
}

/// Drains `chunks`, rendering each fragment as it arrives.
///
/// Stops at the first error and returns it; whatever text had accumulated is
/// dropped with the error.
pub async fn consume<S>(chunks: S, renderer: &mut dyn Renderer) -> Result<StreamOutcome>
where
    S: Stream<Item = Result<ChatCompletionChunk>>,
{
    let mut text = String::new();
    let mut usage = None;
    let mut chunk_count = 0;
    {
        // Usage usually rides on a control chunk, which text_fragments drops.
        let counted = chunks.inspect(|item| {
            if let Ok(chunk) = item {
                STREAM_CHUNKS.click();
                chunk_count += 1;
                if let Some(reported) = chunk.usage() {
                    usage = Some(reported);
                }
            }
        });
        let fragments = text_fragments(counted);
        pin_mut!(fragments);
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            STREAM_FRAGMENTS.click();
            renderer.print_text(&fragment);
            text.push_str(&fragment);
        }
    }
    Ok(StreamOutcome {
        text,
        usage,
        chunk_count,
    })
}
