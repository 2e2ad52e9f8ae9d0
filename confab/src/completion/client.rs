//! Completion client contract and error taxonomy.

use async_trait::async_trait;
use thiserror::Error;

/// Ways a completion round-trip can fail.
///
/// The session layer treats all three identically (fallback message), but the
/// distinction is kept for logging.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Connection could not be established or timed out.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The remote answered but reported a failure (non-2xx status or an
    /// explicit error field in the body).
    #[error("remote error: {0}")]
    Remote(String),
    /// The response body could not be parsed as expected.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type for completion calls.
pub type CompletionResult = Result<String, CompletionError>;

/// Boundary to the remote text-completion service: user text in, assistant
/// text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request an assistant reply for the given user text.
    async fn complete(&self, content: &str) -> CompletionResult;
}
