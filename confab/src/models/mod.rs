//! Data models for confab entities.

mod conversation;
mod message;

pub use conversation::{derive_title, Conversation, DEFAULT_TITLE, TITLE_MAX_CHARS};
pub use message::{Message, MessageRole};
