//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation,
//! the selected model and budget, and runs one streamed turn at a time against
//! a [`CompletionProvider`].

use crate::chat::Renderer;
use crate::error::{Error, Result};
use crate::observability::{SESSION_MODEL_SWITCHES, SESSION_TURN_ERRORS, SESSION_TURNS};
use crate::provider::CompletionProvider;
use crate::stream::consume;
use crate::types::{
    CompletionRequest, KnownModel, MAX_TOKENS_STEP, Message, ModelSpec, PREFERRED_MAX_TOKENS,
    SYSTEM_PROMPT, Usage,
};

/// Builds the request for one turn.
///
/// The message list is copied role-and-content only, in order. `model_id`
/// must name a catalog entry and `max_tokens` must lie within
/// `512..=token_limit`; anything else is a validation error.
pub fn build_request(
    conversation: &[Message],
    model_id: &str,
    max_tokens: u32,
) -> Result<CompletionRequest> {
    let model = KnownModel::from_identifier(model_id).ok_or_else(|| {
        Error::validation(format!("unknown model: {model_id}"), Some("model".into()))
    })?;
    model.spec().check_max_tokens(max_tokens)?;
    let messages = conversation
        .iter()
        .map(|message| Message::new(message.role, message.content.clone()))
        .collect();
    Ok(CompletionRequest::new(model_id, messages, max_tokens))
}

/// A chat session that manages conversation state and API interactions.
///
/// The conversation always starts with the system message. Turns are strictly
/// sequential: [`send_streaming`](Self::send_streaming) borrows the session
/// mutably for the whole stream, so the model cannot change mid-response.
pub struct ChatSession<P: CompletionProvider> {
    provider: P,
    conversation: Vec<Message>,
    selected_model: Option<KnownModel>,
    max_tokens: u32,
    usage_totals: Usage,
    last_turn_usage: Option<Usage>,
    turn_count: u64,
    failed_turns: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The selected model, if any.
    pub model: Option<ModelSpec>,
    /// Number of messages, system message included.
    pub message_count: usize,
    /// The maximum tokens per response.
    pub max_tokens: u32,
    /// Turns attempted.
    pub turns: u64,
    /// Turns that ended in an error notice.
    pub failed_turns: u64,
    /// Prompt tokens across all completed turns.
    pub total_prompt_tokens: u64,
    /// Completion tokens across all completed turns.
    pub total_completion_tokens: u64,
    /// Usage of the last completed turn, if the provider reported it.
    pub last_turn_usage: Option<Usage>,
}

impl<P: CompletionProvider> ChatSession<P> {
    /// Creates a session holding only the system message and no model.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            conversation: vec![Message::system(SYSTEM_PROMPT)],
            selected_model: None,
            max_tokens: PREFERRED_MAX_TOKENS,
            usage_totals: Usage::default(),
            last_turn_usage: None,
            turn_count: 0,
            failed_turns: 0,
        }
    }

    /// Selects `model`, returning whether it changed.
    ///
    /// A change truncates the conversation to the system message and resets
    /// the budget to the model's default. Reselecting the current model does
    /// nothing.
    pub fn select_model(&mut self, model: KnownModel) -> bool {
        if self.selected_model == Some(model) {
            return false;
        }
        self.conversation.truncate(1);
        self.selected_model = Some(model);
        self.max_tokens = model.spec().default_max_tokens();
        SESSION_MODEL_SWITCHES.click();
        true
    }

    /// Selects a model by exact identifier.
    pub fn select_model_by_id(&mut self, id: &str) -> Result<bool> {
        let model = KnownModel::from_identifier(id)
            .ok_or_else(|| Error::validation(format!("unknown model: {id}"), Some("model".into())))?;
        Ok(self.select_model(model))
    }

    /// Returns the selected model, if any.
    pub fn selected_model(&self) -> Option<KnownModel> {
        self.selected_model
    }

    /// Sets the budget for subsequent turns.
    ///
    /// The value must be a multiple of 512 within the selected model's bounds.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        let model = self.selected_model.ok_or_else(|| {
            Error::validation("select a model first", Some("model".to_string()))
        })?;
        model.spec().check_max_tokens(max_tokens)?;
        if max_tokens % MAX_TOKENS_STEP != 0 {
            return Err(Error::validation(
                format!("max_tokens must be a multiple of {MAX_TOKENS_STEP}"),
                Some("max_tokens".to_string()),
            ));
        }
        self.max_tokens = max_tokens;
        Ok(())
    }

    /// Returns the budget used for the next turn.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Appends a user message; blank input is ignored.
    ///
    /// Returns whether a message was appended.
    pub fn append_user_message(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.conversation.push(Message::user(text));
        true
    }

    /// Appends a completed assistant reply.
    pub fn append_assistant_message(&mut self, text: impl Into<String>) {
        self.conversation.push(Message::assistant(text));
    }

    /// Returns the full conversation, system message first.
    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    /// Returns the messages a user may see.
    pub fn history(&self) -> impl Iterator<Item = &Message> {
        self.conversation.iter().filter(|message| !message.is_system())
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Clears the conversation back to the system message.
    pub fn clear(&mut self) {
        self.conversation.truncate(1);
    }

    /// Builds the request for the current state.
    pub fn build_request(&self) -> Result<CompletionRequest> {
        let model = self.selected_model.ok_or_else(|| {
            Error::validation("no model selected", Some("model".to_string()))
        })?;
        build_request(&self.conversation, model.spec().identifier, self.max_tokens)
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to history
    /// 2. Sends a streaming request to the provider
    /// 3. Renders fragments as they arrive
    /// 4. Adds the complete assistant response to history
    ///
    /// Blank input does nothing. On failure the error is rendered as a notice
    /// and returned; the user message stays, no assistant message is added,
    /// and partial text is discarded.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        if !self.append_user_message(user_input) {
            return Ok(());
        }
        self.turn_count += 1;
        SESSION_TURNS.click();

        match self.run_turn(renderer).await {
            Ok((text, usage)) => {
                self.append_assistant_message(text);
                if let Some(usage) = usage {
                    self.usage_totals = self.usage_totals + usage;
                }
                self.last_turn_usage = usage;
                renderer.finish_response();
                Ok(())
            }
            Err(err) => {
                self.failed_turns += 1;
                SESSION_TURN_ERRORS.click();
                renderer.print_error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn run_turn(&self, renderer: &mut dyn Renderer) -> Result<(String, Option<Usage>)> {
        let request = self.build_request()?;
        let stream = self.provider.create_completion(&request).await?;
        if let Some(model) = self.selected_model {
            renderer.start_response(&model.spec());
        }
        let outcome = consume(stream, renderer).await?;
        Ok((outcome.text, outcome.usage))
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.selected_model.map(|model| model.spec()),
            message_count: self.message_count(),
            max_tokens: self.max_tokens,
            turns: self.turn_count,
            failed_turns: self.failed_turns,
            total_prompt_tokens: self.usage_totals.prompt_tokens,
            total_completion_tokens: self.usage_totals.completion_tokens,
            last_turn_usage: self.last_turn_usage,
        }
    }
}
