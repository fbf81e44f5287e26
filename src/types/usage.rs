use serde::{Deserialize, Serialize};

/// Token accounting reported by the provider for one completion.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// The number of prompt tokens which were used.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// The number of generated tokens.
    #[serde(default)]
    pub completion_tokens: u64,

    /// Prompt plus completion tokens.
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Create a new `Usage` with the given prompt and completion tokens.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn usage_deserialization_ignores_timing_fields() {
        let json = json!({
            "queue_time": 0.02,
            "prompt_tokens": 120,
            "prompt_time": 0.01,
            "completion_tokens": 30,
            "completion_time": 0.1,
            "total_tokens": 150
        });
        let usage: Usage = serde_json::from_value(json).unwrap();
        assert_eq!(usage, Usage::new(120, 30));
    }

    #[test]
    fn usage_adds() {
        let total = Usage::new(10, 5) + Usage::new(1, 2);
        assert_eq!(total, Usage::new(11, 7));
    }
}
