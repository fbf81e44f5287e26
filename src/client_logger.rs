//! Logging trait for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`Groq`](crate::Groq)
//! client, plus [`JsonLinesLogger`], which appends one JSON object per line to
//! a file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Mutex;

use serde_json::json;

use crate::error::{Error, Result};
use crate::types::{ChatCompletionChunk, CompletionRequest};

/// A trait for logging completion client operations.
///
/// Implement this trait to capture and record API interactions, including
/// the outgoing request and each streamed chunk.
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &CompletionRequest);

    /// Log an individual streamed chunk.
    ///
    /// This method is called for each chunk received during a streaming
    /// request, including control-only chunks.
    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk);

    /// Log the reply reconstructed from a completed stream.
    ///
    /// This method is called once when a stream completes without error, with
    /// the concatenation of every fragment.
    fn log_stream_reply(&self, reply: &str);
}

/// A [`ClientLogger`] that writes JSON lines to a file.
///
/// Write failures are swallowed so a full disk never interrupts a chat.
pub struct JsonLinesLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::config("failed to open log file", Some(Box::new(err))))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line(&self, value: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = serde_json::to_writer(&mut *writer, &value);
            let _ = writer.write_all(b"\n");
            let _ = writer.flush();
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, request: &CompletionRequest) {
        self.write_line(json!({"event": "request", "request": request}));
    }

    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk) {
        self.write_line(json!({"event": "chunk", "chunk": chunk}));
    }

    fn log_stream_reply(&self, reply: &str) {
        self.write_line(json!({"event": "reply", "content": reply}));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn json_lines_logger_appends_events() {
        let path = std::env::temp_dir().join(format!(
            "dataeng-chat-logger-{}.jsonl",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let logger = JsonLinesLogger::open(&path).unwrap();
        logger.log_request(&CompletionRequest::new(
            "compound-beta",
            vec![Message::user("hi")],
            512,
        ));
        logger.log_stream_chunk(&ChatCompletionChunk::text("Sp"));
        logger.log_stream_reply("Spark");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "request");
        assert_eq!(lines[0]["request"]["model"], "compound-beta");
        assert_eq!(lines[1]["chunk"]["choices"][0]["delta"]["content"], "Sp");
        assert_eq!(lines[2]["content"], "Spark");

        let _ = std::fs::remove_file(&path);
    }
}
