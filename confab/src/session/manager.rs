//! The conversation session manager.
//!
//! Owns the in-memory conversation list, the current-conversation pointer and
//! the typing flag, and coordinates the asynchronous round-trip to the
//! completion service. The one subtlety worth reading twice is in
//! [`SessionManager::send_message`]: the target conversation id is captured
//! *before* the request suspends, and the eventual reply is applied through
//! that captured id. Re-reading the current pointer after the await would
//! write the reply into whatever conversation the user switched to in the
//! meantime.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::completion::CompletionClient;
use crate::models::{Conversation, Message, MessageRole};

use super::events::SessionEvent;

/// Fallback assistant reply shown when the completion round-trip fails.
pub const FALLBACK_REPLY: &str = "Something went wrong. Please try again.";

/// Capacity of the session event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Snapshot of everything the session manager owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// All conversations, newest-created first.
    pub conversations: Vec<Conversation>,
    /// Id of the conversation in focus, if any. A lookup key, not an owning
    /// link: deletion clears it rather than leaving it dangling.
    pub current_conversation_id: Option<String>,
    /// True exactly while a completion request is outstanding.
    pub is_typing: bool,
}

impl SessionState {
    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }
}

/// Manages a set of independent multi-turn conversations against a remote
/// completion service.
///
/// All mutations go through short critical sections on one lock; nothing
/// awaits while holding it, so concurrent sends and selection changes
/// interleave without corrupting each other.
pub struct SessionManager {
    state: RwLock<SessionState>,
    client: Arc<dyn CompletionClient>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Create a manager with an empty session backed by the given client.
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(SessionState::default()),
            client,
            events,
        }
    }

    /// Subscribe to session change events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Create a conversation, optionally titled from a first message, insert
    /// it at the front of the list and make it current.
    ///
    /// Returns a snapshot of the created conversation.
    pub async fn create_conversation(&self, first_message: Option<&str>) -> Conversation {
        let conversation = Conversation::new(first_message);

        let mut state = self.state.write().await;
        state.conversations.insert(0, conversation.clone());
        state.current_conversation_id = Some(conversation.id.clone());
        drop(state);

        info!(id = %conversation.id, title = %conversation.title, "created conversation");
        self.emit(SessionEvent::ConversationCreated {
            conversation_id: conversation.id.clone(),
            title: conversation.title.clone(),
        });
        conversation
    }

    /// Send a user message and reconcile the eventual assistant reply.
    ///
    /// If no conversation is current, one is synthesized from `content` (the
    /// first message titles it and stands for its opening state; no separate
    /// user turn is appended). Otherwise the user turn is appended to the
    /// current conversation before the request is issued.
    ///
    /// Completion failures never propagate: they surface only as the fixed
    /// fallback assistant message and the typing flag returning to false.
    ///
    /// Returns the id of the conversation the reply will land in.
    pub async fn send_message(&self, content: &str) -> String {
        // Step 1: mutate synchronously, before any suspension, and capture
        // the correlation id. Everything after the await addresses the
        // conversation by this id only.
        let correlation_id = {
            let mut state = self.state.write().await;

            let correlation_id = match state.current_conversation_id.clone() {
                Some(id) => {
                    let message = Message::new(MessageRole::User, content);
                    if let Some(conversation) = state.conversation_mut(&id) {
                        conversation.push(message.clone());
                        self.emit(SessionEvent::MessageAppended {
                            conversation_id: id.clone(),
                            message,
                        });
                    }
                    id
                }
                None => {
                    let conversation = Conversation::new(Some(content));
                    let id = conversation.id.clone();
                    info!(id = %id, title = %conversation.title, "created conversation from first send");
                    self.emit(SessionEvent::ConversationCreated {
                        conversation_id: id.clone(),
                        title: conversation.title.clone(),
                    });
                    state.conversations.insert(0, conversation);
                    state.current_conversation_id = Some(id.clone());
                    id
                }
            };

            state.is_typing = true;
            self.emit(SessionEvent::TypingChanged { is_typing: true });
            correlation_id
        };

        // Step 2: the round-trip, with the lock released. Other operations
        // are free to interleave here.
        let reply = match self.client.complete(content).await {
            Ok(text) => text,
            Err(err) => {
                warn!(conversation_id = %correlation_id, error = %err, "completion failed");
                FALLBACK_REPLY.to_string()
            }
        };

        // Step 3: apply the result to the captured conversation. Deletion in
        // the meantime makes this a silent discard.
        let mut state = self.state.write().await;
        if let Some(conversation) = state.conversation_mut(&correlation_id) {
            let message = Message::new(MessageRole::Assistant, reply);
            conversation.push(message.clone());
            self.emit(SessionEvent::MessageAppended {
                conversation_id: correlation_id.clone(),
                message,
            });
        } else {
            warn!(conversation_id = %correlation_id, "discarding reply for deleted conversation");
        }
        state.is_typing = false;
        drop(state);

        self.emit(SessionEvent::TypingChanged { is_typing: false });
        correlation_id
    }

    /// Make the conversation with the given id current. Unknown ids are a
    /// no-op.
    ///
    /// Returns whether the id was found.
    pub async fn select_conversation(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        if state.conversation(id).is_none() {
            debug!(%id, "ignoring selection of unknown conversation");
            return false;
        }
        state.current_conversation_id = Some(id.to_string());
        drop(state);

        debug!(%id, "selected conversation");
        self.emit(SessionEvent::ConversationSelected {
            conversation_id: id.to_string(),
        });
        true
    }

    /// Delete the conversation with the given id, clearing the current
    /// pointer if it pointed there.
    ///
    /// Returns whether anything was removed.
    pub async fn delete_conversation(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let before = state.conversations.len();
        state.conversations.retain(|c| c.id != id);
        if state.conversations.len() == before {
            return false;
        }
        if state.current_conversation_id.as_deref() == Some(id) {
            state.current_conversation_id = None;
        }
        drop(state);

        info!(%id, "deleted conversation");
        self.emit(SessionEvent::ConversationDeleted {
            conversation_id: id.to_string(),
        });
        true
    }

    /// Snapshot of the current conversation, if one is selected.
    pub async fn current_conversation(&self) -> Option<Conversation> {
        let state = self.state.read().await;
        let id = state.current_conversation_id.as_deref()?;
        state.conversation(id).cloned()
    }

    /// Snapshot of one conversation by id.
    pub async fn conversation(&self, id: &str) -> Option<Conversation> {
        self.state.read().await.conversation(id).cloned()
    }

    /// Snapshot of all conversations, newest-created first.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    /// Whether a completion request is outstanding.
    pub async fn is_typing(&self) -> bool {
        self.state.read().await.is_typing
    }

    /// Snapshot of the whole session state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}
