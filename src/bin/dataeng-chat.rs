//! Interactive chat with DataEng GPT, a data-engineering assistant.
//!
//! This binary provides a streaming REPL over Groq's OpenAI-compatible API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with GROQ_API_KEY in the environment
//! dataeng-chat
//!
//! # Pick a model by id, display name, or catalog index
//! dataeng-chat --model qwen-qwq-32b --max-tokens 32768
//!
//! # Read the key from a YAML secrets file
//! dataeng-chat --secrets ~/.config/dataeng-chat/secrets.yaml
//!
//! # Disable colors (useful for piping output)
//! dataeng-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/models` - List the model catalog
//! - `/model <name|n>` - Switch model, clearing the conversation
//! - `/max_tokens <n>` - Set the response budget
//! - `/clear` - Clear conversation history
//! - `/history` - Reprint the conversation
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application
//!
//! Start a message with `//` to send text that begins with a slash.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use dataeng_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    message_text, parse_command,
};
use dataeng_chat::secrets::resolve_api_key;
use dataeng_chat::{CompletionProvider, Groq, JsonLinesLogger, KnownModel};

/// Main entry point for the dataeng-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("dataeng-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let secrets_path = config.secrets_path.as_deref().map(utf8path::Path::from);
    let api_key = match resolve_api_key(secrets_path.as_ref()) {
        Ok(key) => key,
        Err(err) => {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
    };

    let mut client = Groq::with_options(Some(api_key), config.base_url.clone(), None)?;
    if let Some(path) = &config.log_file {
        client = client.with_logger(Arc::new(JsonLinesLogger::open(path)?));
    }

    let mut session = ChatSession::new(client);
    session.select_model(config.model);
    session.set_max_tokens(config.initial_max_tokens())?;
    let mut rl = DefaultEditor::new()?;

    println!("DataEng GPT: Chat with your Data Engineering Expert");
    println!(
        "Model: {} ({} max tokens)",
        config.model.spec().display_name,
        session.max_tokens()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for help_line in help_text().lines() {
                                println!("    {}", help_line);
                            }
                        }
                        ChatCommand::Models => {
                            print_models(session.selected_model());
                        }
                        ChatCommand::Model(query) => match query.parse::<KnownModel>() {
                            Ok(model) => {
                                if session.select_model(model) {
                                    renderer.print_info(&format!(
                                        "Model changed to {}; conversation cleared, max_tokens reset to {}.",
                                        model.spec().display_name,
                                        session.max_tokens()
                                    ));
                                } else {
                                    renderer.print_info(&format!(
                                        "Already using {}.",
                                        model.spec().display_name
                                    ));
                                }
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::MaxTokens(value) => match session.set_max_tokens(value) {
                            Ok(()) => renderer.print_info(&format!("max_tokens set to {value}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::History => {
                            if session.history().next().is_none() {
                                renderer.print_info("No messages yet.");
                            }
                            for message in session.history() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // The session already rendered any error as a notice.
                let _ = session
                    .send_streaming(message_text(&line), &mut renderer)
                    .await;
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_models(selected: Option<KnownModel>) {
    println!("    Available models:");
    for (index, model) in KnownModel::ALL.into_iter().enumerate() {
        let spec = model.spec();
        let marker = if selected == Some(model) { "*" } else { " " };
        println!(
            "    {marker} {}. {} [{}] up to {} tokens",
            index + 1,
            spec.display_name,
            spec.identifier,
            spec.token_limit
        );
    }
}

fn print_stats<P: CompletionProvider>(session: &ChatSession<P>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    match stats.model {
        Some(model) => println!("      Model: {} ({})", model.display_name, model.identifier),
        None => println!("      Model: (none)"),
    }
    println!("      Messages: {}", stats.message_count);
    println!("      Max tokens: {}", stats.max_tokens);
    println!(
        "      Turns: {} ({} failed)",
        stats.turns, stats.failed_turns
    );
    println!(
        "      Total tokens: {} in / {} out",
        stats.total_prompt_tokens, stats.total_completion_tokens
    );
    if let Some(usage) = stats.last_turn_usage {
        println!(
            "      Last turn tokens: {} in / {} out",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
}
