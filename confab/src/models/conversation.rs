//! Conversation model: an ordered, titled collection of messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// Maximum number of characters taken from the first message for a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Title used when a conversation is created without a seed message.
pub const DEFAULT_TITLE: &str = "New Chat";

/// One chat thread.
///
/// Messages are append-only: they are never reordered, edited in place, or
/// individually removed. The whole conversation disappears only on explicit
/// deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: String,
    /// Display title, derived once from the first message.
    pub title: String,
    /// Ordered message history.
    pub messages: Vec<Message>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// Last successful append.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation, titling it from the first message if given.
    pub fn new(first_message: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            title: derive_title(first_message),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}

/// Derive a display title from an optional first message.
///
/// Takes the first [`TITLE_MAX_CHARS`] characters and marks truncation with
/// an ellipsis. Character-based so multi-byte input never splits a glyph.
pub fn derive_title(first_message: Option<&str>) -> String {
    match first_message {
        Some(text) => {
            let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
            if text.chars().count() > TITLE_MAX_CHARS {
                title.push_str("...");
            }
            title
        }
        None => DEFAULT_TITLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[test]
    fn test_title_from_short_message() {
        assert_eq!(derive_title(Some("short")), "short");
    }

    #[test]
    fn test_title_truncates_long_message() {
        let long = "a".repeat(60);
        let title = derive_title(Some(&long));
        assert_eq!(title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_title_exactly_at_limit_not_truncated() {
        let exact = "b".repeat(50);
        assert_eq!(derive_title(Some(&exact)), exact);
    }

    #[test]
    fn test_title_placeholder_without_message() {
        assert_eq!(derive_title(None), DEFAULT_TITLE);
    }

    #[test]
    fn test_title_multibyte_safe() {
        let long: String = "é".repeat(60);
        let title = derive_title(Some(&long));
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn test_push_bumps_updated_at() {
        let mut conversation = Conversation::new(Some("hello"));
        let before = conversation.updated_at;
        conversation.push(Message::new(MessageRole::User, "hello again"));
        assert!(conversation.updated_at >= before);
        assert_eq!(conversation.messages.len(), 1);
    }
}
