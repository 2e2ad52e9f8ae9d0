//! Boundary to the remote text-completion service.

mod client;
mod http;

pub use client::{CompletionClient, CompletionError, CompletionResult};
pub use http::HttpCompletionClient;
