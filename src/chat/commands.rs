//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to pick a model or budget without sending messages to the
//! API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history, keeping the model.
    Clear,

    /// List the model catalog.
    Models,

    /// Select a model by id, display name, or catalog index.
    Model(String),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Reprint the visible transcript.
    History,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message. A leading `//` escapes the slash;
/// see [`message_text`].
///
/// # Examples
///
/// ```
/// # use dataeng_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model qwen-qwq-32b").is_some());
/// assert!(parse_command("Explain partitioning in Spark").is_none());
/// assert!(parse_command("//etc/hosts is read first").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    if input.starts_with("//") {
        return None;
    }

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "models" => ChatCommand::Models,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Models,
        },
        "max_tokens" | "tokens" => match argument {
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) => ChatCommand::MaxTokens(value),
                Err(_) => {
                    ChatCommand::Invalid(format!("/{command} expects a positive integer"))
                }
            },
            None => ChatCommand::Invalid(format!("/{command} requires a value")),
        },
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns the chat message for input that is not a command.
///
/// The input is returned as typed, except that a leading `//` loses one slash.
pub fn message_text(input: &str) -> &str {
    match input.trim_start().strip_prefix('/') {
        Some(unescaped) if unescaped.starts_with('/') => unescaped,
        _ => input,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /models                List the available models
  /model <name|n>        Switch model (clears the conversation)
  /max_tokens <n>        Set max tokens per response (multiple of 512)
  /clear                 Clear conversation history
  /history               Show the conversation so far
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat
  //text                 Send a message that starts with /"#
}
