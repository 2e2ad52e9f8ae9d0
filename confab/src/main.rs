//! Confab - hold independent multi-turn conversations with a remote
//! text-completion service.
//!
//! Architecture:
//! - The server owns the in-memory session state (conversations, current
//!   pointer, typing flag) and serves it over HTTP plus a WebSocket event
//!   stream
//! - The CLI is a thin client that talks to the server via HTTP
//! - Nothing is persisted across restarts

mod cli;
mod completion;
mod models;
mod server;
mod session;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
