//! Interactive chat over a streaming completion provider.
//!
//! This module provides the pieces of the DataEng GPT REPL:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation state and streamed turns
//! - [`commands`]: Slash command parsing
//! - [`render`]: Output rendering

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, message_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatSession, SessionStats, build_request};

#[cfg(test)]
pub(crate) use render::RecordingRenderer;
