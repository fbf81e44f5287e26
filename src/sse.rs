//! Server-Sent Events (SSE) processing for streaming completions.
//!
//! This module turns the raw byte stream of a `chat/completions` response into
//! parsed [`ChatCompletionChunk`]s. Events are `data:` lines separated by a
//! blank line; the stream ends at `data: [DONE]`.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::error::{Error, Result, StreamFailure};
use crate::observability::{STREAM_BYTES, STREAM_ERRORS};
use crate::types::ChatCompletionChunk;

const DONE_MARKER: &str = "[DONE]";

/// What a single SSE event decoded to.
#[derive(Debug)]
enum Extracted {
    Chunk(Result<ChatCompletionChunk>),
    Skip,
    Done,
    Fatal(Error),
}

/// In-band error object some providers send instead of a chunk.
#[derive(Deserialize)]
struct StreamErrorEnvelope {
    error: StreamErrorDetail,
}

#[derive(Deserialize)]
struct StreamErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

/// Process a stream of bytes into a stream of completion chunks.
///
/// The returned stream yields chunks in arrival order and ends at the
/// `[DONE]` marker or when the byte stream ends, whichever comes first.
/// Network reads may split an event anywhere, including inside a UTF-8
/// sequence or a CRLF pair; bytes are buffered until a whole event is present
/// and only then decoded.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result.map_err(|e| {
            Error::stream(
                StreamFailure::Transport,
                format!("error reading response body: {e}"),
                Some(Box::new(e)),
            )
        })
    });

    stream::unfold(
        (stream, BytesMut::new(), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some(extracted) = next_event(&mut buffer) {
                    match extracted {
                        Extracted::Chunk(chunk) => {
                            if chunk.is_err() {
                                STREAM_ERRORS.click();
                            }
                            return Some((chunk, (stream, buffer, false)));
                        }
                        Extracted::Skip => continue,
                        Extracted::Done => return None,
                        Extracted::Fatal(err) => {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, buffer, true)));
                        }
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // A final event may arrive without its trailing blank line.
                        if buffer.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        let tail = buffer.split();
                        return match decode_event(&tail) {
                            Extracted::Chunk(chunk) => Some((chunk, (stream, buffer, true))),
                            Extracted::Fatal(err) => Some((Err(err), (stream, buffer, true))),
                            Extracted::Skip | Extracted::Done => None,
                        };
                    }
                }
            }
        },
    )
}

/// Locates the first blank line in `buffer`.
///
/// Lines end in `\n`, `\r\n`, or a lone `\r`. Returns the length of the event
/// text and the offset where the next event starts, or `None` when no complete
/// event is buffered yet. A trailing `\r` is ambiguous until the next byte
/// arrives.
fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let line_break = |at: usize| -> Option<Option<usize>> {
        match buffer.get(at) {
            Some(b'\n') => Some(Some(1)),
            Some(b'\r') => match buffer.get(at + 1) {
                Some(b'\n') => Some(Some(2)),
                Some(_) => Some(Some(1)),
                None => None,
            },
            Some(_) => Some(None),
            None => None,
        }
    };

    let mut at = 0;
    while at < buffer.len() {
        let Some(width) = line_break(at)? else {
            at += 1;
            continue;
        };
        let next_line = at + width;
        match line_break(next_line)? {
            Some(blank) => return Some((at, next_line + blank)),
            None => at = next_line,
        }
    }
    None
}

/// Removes and decodes one complete event from the front of `buffer`.
fn next_event(buffer: &mut BytesMut) -> Option<Extracted> {
    let (event_len, consumed) = find_event_end(buffer)?;
    let event = buffer.split_to(consumed);
    Some(decode_event(&event[..event_len]))
}

fn decode_event(event: &[u8]) -> Extracted {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            return Extracted::Fatal(Error::stream(
                StreamFailure::Encoding,
                format!("event is not valid UTF-8: {e}"),
                Some(Box::new(e)),
            ));
        }
    };

    let data = text
        .split(['\n', '\r'])
        .filter(|line| !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect::<Vec<_>>();
    if data.is_empty() {
        return Extracted::Skip;
    }
    let data = data.join("\n");
    let data = data.trim();

    if data == DONE_MARKER {
        return Extracted::Done;
    }
    Extracted::Chunk(parse_chunk(data))
}

fn parse_chunk(data: &str) -> Result<ChatCompletionChunk> {
    if let Ok(envelope) = serde_json::from_str::<StreamErrorEnvelope>(data) {
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| "no message".to_string());
        let message = match envelope.error.error_type {
            Some(error_type) => format!("{error_type}: {message}"),
            None => message,
        };
        return Err(Error::stream(StreamFailure::Provider, message, None));
    }
    serde_json::from_str::<ChatCompletionChunk>(data).map_err(|e| {
        Error::stream(
            StreamFailure::Malformed,
            format!("{e} in {data:?}"),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn bytes_stream(
        chunks: &[&'static [u8]],
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + Unpin + 'static
    {
        stream::iter(
            chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(*c)))
                .collect::<Vec<_>>(),
        )
    }

    const FIRST: &[u8] = b"data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Sp\"}}]}\n\n";
    const SECOND: &[u8] = b"data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ark\"}}]}\n\n";

    #[tokio::test]
    async fn parse_single_chunk() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[FIRST])));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.fragment(), Some("Sp"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_multiple_chunks_then_done() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            FIRST,
            SECOND,
            b"data: [DONE]\n\n",
            b"data: {\"id\":\"ignored\"}\n\n",
        ])));

        let first = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(first.fragment(), Some("Sp"));
        let second = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(second.fragment(), Some("ark"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_split_event() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            b"data: {\"id\":\"c1\",\"choices\":[{\"index\":0,",
            b"\"delta\":{\"content\":\"Sp\"}}]}\n",
            b"\ndata: [DONE]\n\n",
        ])));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.fragment(), Some("Sp"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_crlf_and_comments() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            b": keep-alive\r\n\r\n",
            b"data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Sp\"}}]}\r\n\r\n",
        ])));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.fragment(), Some("Sp"));
    }

    #[tokio::test]
    async fn handle_malformed_chunk() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[b"data: {not json\n\n"])));
        let event = sse_stream.next().await.unwrap();
        let err = event.unwrap_err();
        assert_eq!(err.stream_failure(), Some(StreamFailure::Malformed));
    }

    #[tokio::test]
    async fn handle_in_band_error() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            b"data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n",
        ])));
        let event = sse_stream.next().await.unwrap();
        match event {
            Err(e) => {
                assert_eq!(e.stream_failure(), Some(StreamFailure::Provider));
                assert_eq!(
                    e.to_string(),
                    "provider error mid-stream: server_error: model overloaded"
                );
            }
            Ok(chunk) => panic!("expected error, got {chunk:?}"),
        }
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            b"data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"end\"}}]}",
        ])));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.fragment(), Some("end"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let items: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(FIRST)),
        ];
        let mut sse_stream = Box::pin(process_sse(stream::iter(items)));
        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.stream_failure(), Some(StreamFailure::Transport));
        assert!(sse_stream.next().await.is_none());
    }

    fn owned_stream(
        chunks: Vec<Vec<u8>>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + Unpin + 'static
    {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from(c)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn multibyte_character_split_across_reads() {
        let body = "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"café — ok\"}}]}\n\ndata: [DONE]\n\n"
            .as_bytes()
            .to_vec();
        // Split right after the first byte of the two-byte 'é'.
        let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut sse_stream = Box::pin(process_sse(owned_stream(vec![
            body[..split].to_vec(),
            body[split..].to_vec(),
        ])));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.fragment(), Some("café — ok"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn every_split_point_yields_same_fragments() {
        let body = "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"数据 ✓\"}}]}\r\n\r\ndata: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"🚀\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n"
            .as_bytes()
            .to_vec();
        for split in 1..body.len() {
            let sse_stream = process_sse(owned_stream(vec![
                body[..split].to_vec(),
                body[split..].to_vec(),
            ]));
            let fragments: Vec<String> = sse_stream
                .map(|chunk| chunk.unwrap().fragment().unwrap().to_string())
                .collect()
                .await;
            assert_eq!(fragments, vec!["数据 ✓", "🚀"], "split at {split}");
        }
    }

    #[tokio::test]
    async fn crlf_delimiter_split_between_cr_and_lf() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            b"data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Sp\"}}]}\r\n\r",
            b"\ndata: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ark\"}}]}\r\n\r\n",
        ])));
        let first = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(first.fragment(), Some("Sp"));
        let second = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(second.fragment(), Some("ark"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn bare_cr_line_endings() {
        let mut sse_stream = Box::pin(process_sse(bytes_stream(&[
            b": ping\r\rdata: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Sp\"}}]}\r\r",
            b"data: [DONE]\r\r",
        ])));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.fragment(), Some("Sp"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_event_ends_stream() {
        let mut sse_stream = Box::pin(process_sse(owned_stream(vec![
            b"data: {\"id\":\"\xff\"}\n\n".to_vec(),
            FIRST.to_vec(),
        ])));
        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.stream_failure(), Some(StreamFailure::Encoding));
        assert!(sse_stream.next().await.is_none());
    }

    #[test]
    fn event_end_waits_for_ambiguous_cr() {
        assert_eq!(find_event_end(b"data: x\r\n\r"), None);
        assert_eq!(find_event_end(b"data: x\r\n\r\nrest"), Some((7, 11)));
        assert_eq!(find_event_end(b"data: x\n\nrest"), Some((7, 9)));
        assert_eq!(find_event_end(b"data: x\ndata: y\n"), None);
    }
}
