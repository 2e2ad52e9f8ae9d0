//! Message model representing one turn in a conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the assistant.
    Assistant,
}

impl MessageRole {
    /// Convert role to its wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One turn in a conversation.
///
/// The id and timestamp are assigned once at creation and never change;
/// the content is immutable after that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier for the message.
    pub id: String,
    /// Text payload.
    pub content: String,
    /// Who authored this turn.
    pub role: MessageRole,
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message with a fresh id and the current time.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_strings() {
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_message_ids_unique() {
        let a = Message::new(MessageRole::User, "hi");
        let b = Message::new(MessageRole::User, "hi");
        assert_ne!(a.id, b.id);
    }
}
