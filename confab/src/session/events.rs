//! Session change events broadcast to observers (WebSocket subscribers).

use serde::Serialize;

use crate::models::Message;

/// State-change notification emitted by the session manager.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A conversation was created (explicitly or by a first send).
    #[serde(rename_all = "camelCase")]
    ConversationCreated {
        conversation_id: String,
        title: String,
    },
    /// The current conversation changed.
    #[serde(rename_all = "camelCase")]
    ConversationSelected { conversation_id: String },
    /// A conversation was deleted.
    #[serde(rename_all = "camelCase")]
    ConversationDeleted { conversation_id: String },
    /// A message was appended to a conversation.
    #[serde(rename_all = "camelCase")]
    MessageAppended {
        conversation_id: String,
        message: Message,
    },
    /// The typing indicator flipped.
    #[serde(rename_all = "camelCase")]
    TypingChanged { is_typing: bool },
}
