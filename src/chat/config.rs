//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::types::{KnownModel, MAX_TOKENS_STEP};

/// Command-line arguments for the dataeng-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to start with.
    #[arrrg(
        optional,
        "Model id, display name, or catalog index (default: 1)",
        "MODEL"
    )]
    pub model: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(
        optional,
        "Max tokens per response (default: min(8192, model limit))",
        "TOKENS"
    )]
    pub max_tokens: Option<u32>,

    /// YAML file holding GROQ_API_KEY.
    #[arrrg(optional, "YAML secrets file containing GROQ_API_KEY", "FILE")]
    pub secrets: Option<String>,

    /// Alternate API endpoint.
    #[arrrg(optional, "Base URL of the OpenAI-compatible API", "URL")]
    pub base_url: Option<String>,

    /// File to append JSON-lines API logs to.
    #[arrrg(optional, "Append request/stream logs to this file", "FILE")]
    pub log_file: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model selected when the session starts.
    pub model: KnownModel,

    /// Max tokens override; `None` uses the model's default.
    pub max_tokens: Option<u32>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Secrets file consulted before the environment.
    pub secrets_path: Option<String>,

    /// Alternate API base URL.
    pub base_url: Option<String>,

    /// Where to append JSON-lines API logs.
    pub log_file: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: the first catalog entry
    /// - Max tokens: the model's default
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: KnownModel::default(),
            max_tokens: None,
            use_color: true,
            secrets_path: None,
            base_url: None,
            log_file: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: KnownModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the secrets file path.
    pub fn with_secrets_path(mut self, path: impl Into<String>) -> Self {
        self.secrets_path = Some(path.into());
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the log file path.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// The budget the session starts with.
    pub fn initial_max_tokens(&self) -> u32 {
        self.max_tokens
            .unwrap_or_else(|| self.model.spec().default_max_tokens())
    }

    /// Checks the configured budget against the configured model.
    pub fn validate(&self) -> Result<()> {
        let max_tokens = self.initial_max_tokens();
        self.model.spec().check_max_tokens(max_tokens)?;
        if max_tokens % MAX_TOKENS_STEP != 0 {
            return Err(Error::validation(
                format!("max_tokens must be a multiple of {MAX_TOKENS_STEP}"),
                Some("max_tokens".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let model = match args.model {
            Some(model) => model.parse::<KnownModel>()?,
            None => KnownModel::default(),
        };
        let config = ChatConfig {
            model,
            max_tokens: args.max_tokens,
            use_color: !args.no_color,
            secrets_path: args.secrets,
            base_url: args.base_url,
            log_file: args.log_file.map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }
}
