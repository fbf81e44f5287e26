use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The smallest budget the max-tokens control offers.
pub const MIN_MAX_TOKENS: u32 = 512;

/// The granularity of the max-tokens control.
pub const MAX_TOKENS_STEP: u32 = 512;

/// The preferred default budget, clamped to the model's limit.
pub const PREFERRED_MAX_TOKENS: u32 = 8192;

/// Known Groq-hosted models offered by the chat.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// LLaMA 4 Scout (17B-16E-Instruct)
    #[serde(rename = "meta-llama/llama-4-scout-17b-16e-instruct")]
    Llama4Scout,

    /// LLaMA 4 Maverick (17B-128E-Instruct)
    #[serde(rename = "meta-llama/llama-4-maverick-17b-128e-instruct")]
    Llama4Maverick,

    /// Qwen-QwQ-32B
    #[serde(rename = "qwen-qwq-32b")]
    QwenQwq32b,

    /// DeepSeek R1 Distill LLaMA 70B
    #[serde(rename = "deepseek-r1-distill-llama-70b")]
    DeepSeekR1DistillLlama70b,

    /// Groq Compound Beta
    #[serde(rename = "compound-beta")]
    CompoundBeta,
}

/// Static description of a selectable model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// The identifier sent to the provider.
    pub identifier: &'static str,
    /// The human-facing name shown in the selection list.
    pub display_name: &'static str,
    /// The largest max-tokens budget the model accepts.
    pub token_limit: u32,
}

impl ModelSpec {
    /// The budget preselected when this model becomes active.
    pub fn default_max_tokens(&self) -> u32 {
        PREFERRED_MAX_TOKENS.min(self.token_limit)
    }

    /// Checks that `max_tokens` lies within `MIN_MAX_TOKENS..=token_limit`.
    pub fn check_max_tokens(&self, max_tokens: u32) -> Result<()> {
        if (MIN_MAX_TOKENS..=self.token_limit).contains(&max_tokens) {
            Ok(())
        } else {
            Err(Error::validation(
                format!(
                    "max_tokens {max_tokens} outside {MIN_MAX_TOKENS}..={} for {}",
                    self.token_limit, self.identifier
                ),
                Some("max_tokens".to_string()),
            ))
        }
    }

    /// Values the max-tokens control offers for this model, smallest first.
    pub fn max_tokens_choices(&self) -> impl Iterator<Item = u32> + '_ {
        (MIN_MAX_TOKENS..=self.token_limit).step_by(MAX_TOKENS_STEP as usize)
    }
}

impl KnownModel {
    /// Every known model in selection order; the first entry is the default.
    pub const ALL: [KnownModel; 5] = [
        KnownModel::Llama4Scout,
        KnownModel::Llama4Maverick,
        KnownModel::QwenQwq32b,
        KnownModel::DeepSeekR1DistillLlama70b,
        KnownModel::CompoundBeta,
    ];

    /// Returns the catalog entry for this model.
    pub fn spec(&self) -> ModelSpec {
        match self {
            KnownModel::Llama4Scout => ModelSpec {
                identifier: "meta-llama/llama-4-scout-17b-16e-instruct",
                display_name: "LLaMA 4 Scout (17B-16E-Instruct)",
                token_limit: 8192,
            },
            KnownModel::Llama4Maverick => ModelSpec {
                identifier: "meta-llama/llama-4-maverick-17b-128e-instruct",
                display_name: "LLaMA 4 Maverick (17B-128E-Instruct)",
                token_limit: 8192,
            },
            KnownModel::QwenQwq32b => ModelSpec {
                identifier: "qwen-qwq-32b",
                display_name: "Qwen-QwQ-32B",
                token_limit: 131072,
            },
            KnownModel::DeepSeekR1DistillLlama70b => ModelSpec {
                identifier: "deepseek-r1-distill-llama-70b",
                display_name: "DeepSeek R1 Distill LLaMA 70B",
                token_limit: 131072,
            },
            KnownModel::CompoundBeta => ModelSpec {
                identifier: "compound-beta",
                display_name: "Groq Compound Beta",
                token_limit: 8192,
            },
        }
    }

    /// Looks up a model by its exact provider identifier.
    pub fn from_identifier(identifier: &str) -> Option<KnownModel> {
        KnownModel::ALL
            .into_iter()
            .find(|model| model.spec().identifier == identifier)
    }

    /// Resolves a model by identifier, display name, or 1-based catalog index.
    pub fn resolve(query: &str) -> Option<KnownModel> {
        let query = query.trim();
        if let Ok(index) = query.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|idx| KnownModel::ALL.get(idx))
                .copied();
        }
        KnownModel::ALL.into_iter().find(|model| {
            let spec = model.spec();
            spec.identifier == query || spec.display_name.eq_ignore_ascii_case(query)
        })
    }
}

impl Default for KnownModel {
    fn default() -> Self {
        KnownModel::ALL[0]
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().identifier)
    }
}

impl FromStr for KnownModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        KnownModel::resolve(s)
            .ok_or_else(|| Error::validation(format!("unknown model: {s}"), Some("model".into())))
    }
}
