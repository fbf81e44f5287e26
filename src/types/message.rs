use serde::{Deserialize, Serialize};

/// Role type for a conversation message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The fixed instruction that opens every conversation.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a conversation.
///
/// Messages are never edited after creation; the conversation only grows or is
/// truncated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,
}

impl Message {
    /// Create a new `Message` with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system `Message`.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a new user `Message`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Returns true for the hidden system instruction.
    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_serialization() {
        let message = Message::user("Explain partitioning in Spark");
        let json = to_value(&message).unwrap();

        assert_eq!(
            json,
            json!({
                "role": "user",
                "content": "Explain partitioning in Spark"
            })
        );
    }

    #[test]
    fn system_role_serializes_lowercase() {
        let json = to_value(Message::system("be terse")).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn message_deserialization() {
        let json = json!({
            "role": "assistant",
            "content": "Spark splits data into partitions."
        });

        let message: Message = serde_json::from_value(json).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content, "Spark splits data into partitions.");
        assert!(!message.is_system());
    }
}
