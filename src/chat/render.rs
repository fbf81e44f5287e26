//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the session can
//! stream output without knowing where it goes. The default implementation
//! writes to stdout with optional ANSI styling.

use std::io::{self, Stdout, Write};

use crate::types::{Message, MessageRole, ModelSpec};

/// ANSI escape code for bold text (used for speaker labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for informational notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for error notices).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - In-memory capture for tests
pub trait Renderer: Send {
    /// Called before the first fragment of an assistant reply.
    fn start_response(&mut self, model: &ModelSpec);

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed from the API.
    fn print_text(&mut self, text: &str);

    /// Called when a response stream completes.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Print a visible, non-fatal error notice.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print one message of the visible transcript.
    fn print_message(&mut self, message: &Message);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_response: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn end_response_line(&mut self) {
        if self.in_response {
            println!();
            self.in_response = false;
        }
    }

    fn label(&self, role: MessageRole, name: &str) -> String {
        if !self.use_color {
            return format!("{name}:");
        }
        let color = match role {
            MessageRole::User => ANSI_GREEN,
            _ => ANSI_CYAN,
        };
        format!("{ANSI_BOLD}{color}{name}:{ANSI_RESET}")
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self, model: &ModelSpec) {
        let label = self.label(MessageRole::Assistant, "DataEng GPT");
        if self.use_color {
            println!("{label} {ANSI_DIM}({}){ANSI_RESET}", model.display_name);
        } else {
            println!("{label} ({})", model.display_name);
        }
        self.in_response = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_response_line();
        println!();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_response_line();
        if self.use_color {
            eprintln!("{ANSI_RED}API Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("API Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.end_response_line();
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn print_message(&mut self, message: &Message) {
        let label = match message.role {
            MessageRole::System => return,
            MessageRole::User => self.label(MessageRole::User, "You"),
            MessageRole::Assistant => self.label(MessageRole::Assistant, "DataEng GPT"),
        };
        println!("{label}\n{}\n", message.content);
        self.flush();
    }
}

/// Renderer that records everything it is given.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    pub text: String,
    pub fragments: Vec<String>,
    pub errors: Vec<String>,
    pub infos: Vec<String>,
    pub messages: Vec<Message>,
    pub started: usize,
    pub finished: usize,
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn start_response(&mut self, _: &ModelSpec) {
        self.started += 1;
    }

    fn print_text(&mut self, text: &str) {
        self.text.push_str(text);
        self.fragments.push(text.to_string());
    }

    fn finish_response(&mut self) {
        self.finished += 1;
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn print_message(&mut self, message: &Message) {
        self.messages.push(message.clone());
    }
}
