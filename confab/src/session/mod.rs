//! Conversation session management.

mod events;
mod manager;

pub use events::SessionEvent;
pub use manager::{SessionManager, SessionState, FALLBACK_REPLY};
