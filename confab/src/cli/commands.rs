//! CLI command execution.
//!
//! This is a thin client - all session state lives in the server.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::Conversation;
use crate::server;
use crate::session::SessionState;

use super::args::{Cli, Commands};

// === HTTP Client for Server Communication ===

/// Response from sending a message.
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    conversation_id: String,
}

/// Send a message via the server. Returns the conversation it landed in.
async fn send_message_on_server(port: u16, content: &str) -> Result<String> {
    let url = format!("http://127.0.0.1:{port}/api/messages");
    let body = serde_json::json!({ "content": content });

    let resp = reqwest::Client::new()
        .post(&url)
        .json(&body)
        .send()
        .await
        .context("Failed to send message to server")?;

    if !resp.status().is_success() {
        bail!("Server returned {}", resp.status());
    }

    let response: SendMessageResponse = resp.json().await.context("Failed to parse response")?;
    Ok(response.conversation_id)
}

/// Create a conversation via the server.
async fn create_conversation_on_server(
    port: u16,
    first_message: Option<&str>,
) -> Result<Conversation> {
    let url = format!("http://127.0.0.1:{port}/api/conversations");
    let body = serde_json::json!({ "first_message": first_message });

    let resp = reqwest::Client::new()
        .post(&url)
        .json(&body)
        .send()
        .await
        .context("Failed to create conversation on server")?;

    if !resp.status().is_success() {
        bail!("Server returned {}", resp.status());
    }

    let conversation: Conversation = resp.json().await.context("Failed to parse conversation")?;
    Ok(conversation)
}

/// Get the full session snapshot from the server.
async fn get_state_from_server(port: u16) -> Result<SessionState> {
    let url = format!("http://127.0.0.1:{port}/api/state");

    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .context("Failed to get state from server")?;

    if !resp.status().is_success() {
        bail!("Server returned {}", resp.status());
    }

    let state: SessionState = resp.json().await.context("Failed to parse state")?;
    Ok(state)
}

/// Get one conversation from the server; `None` id means the current one.
async fn get_conversation_from_server(port: u16, id: Option<&str>) -> Result<Conversation> {
    let url = match id {
        Some(id) => format!("http://127.0.0.1:{port}/api/conversations/{id}"),
        None => format!("http://127.0.0.1:{port}/api/conversations/current"),
    };

    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .context("Failed to get conversation from server")?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        bail!("No such conversation");
    }
    if !resp.status().is_success() {
        bail!("Server returned {}", resp.status());
    }

    let conversation: Conversation = resp.json().await.context("Failed to parse conversation")?;
    Ok(conversation)
}

/// Select a conversation via the server.
async fn select_conversation_on_server(port: u16, id: &str) -> Result<()> {
    let url = format!("http://127.0.0.1:{port}/api/conversations/{id}/select");

    let resp = reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .context("Failed to select conversation on server")?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        bail!("No such conversation: {id}");
    }
    if !resp.status().is_success() {
        bail!("Server returned {}", resp.status());
    }

    Ok(())
}

/// Delete a conversation via the server.
async fn delete_conversation_on_server(port: u16, id: &str) -> Result<()> {
    let url = format!("http://127.0.0.1:{port}/api/conversations/{id}");

    let resp = reqwest::Client::new()
        .delete(&url)
        .send()
        .await
        .context("Failed to delete conversation on server")?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        bail!("No such conversation: {id}");
    }
    if !resp.status().is_success() {
        bail!("Server returned {}", resp.status());
    }

    Ok(())
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Serve { port, endpoint }) => {
            init_tracing();
            server::start_server(port, endpoint).await
        }
        Some(Commands::Send { message }) => {
            let message = message.join(" ");
            if message.is_empty() {
                bail!("Message is required for send command");
            }
            send_message(&message).await
        }
        Some(Commands::New { message }) => {
            let message = message.join(" ");
            let seed = if message.is_empty() {
                None
            } else {
                Some(message.as_str())
            };
            new_conversation(seed).await
        }
        Some(Commands::List) => list_conversations().await,
        Some(Commands::Show { id }) => show_conversation(id.as_deref()).await,
        Some(Commands::Select { id }) => {
            let port = server::ensure_server_running()?;
            select_conversation_on_server(port, &id).await?;
            println!("Selected conversation {id}");
            Ok(())
        }
        Some(Commands::Delete { id }) => {
            let port = server::ensure_server_running()?;
            delete_conversation_on_server(port, &id).await?;
            println!("Deleted conversation {id}");
            Ok(())
        }
        None => {
            let message = cli.message.join(" ");
            if message.is_empty() {
                bail!("Nothing to do. Try `confab <message>` or `confab --help`");
            }
            send_message(&message).await
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

async fn send_message(message: &str) -> Result<()> {
    let port = server::ensure_server_running()?;
    let conversation_id = send_message_on_server(port, message).await?;

    let conversation = get_conversation_from_server(port, Some(&conversation_id)).await?;
    if let Some(reply) = conversation.messages.last() {
        println!("{}", reply.content);
    }
    Ok(())
}

async fn new_conversation(seed: Option<&str>) -> Result<()> {
    let port = server::ensure_server_running()?;
    let conversation = create_conversation_on_server(port, seed).await?;
    println!("Started \"{}\" ({})", conversation.title, conversation.id);
    Ok(())
}

async fn list_conversations() -> Result<()> {
    let port = server::ensure_server_running()?;
    let state = get_state_from_server(port).await?;

    if state.conversations.is_empty() {
        println!("No conversations yet. Try `confab <message>`.");
        return Ok(());
    }

    for conversation in &state.conversations {
        let marker = if state.current_conversation_id.as_deref() == Some(&conversation.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {:40}  {} messages  {}",
            conversation.id,
            conversation.title,
            conversation.messages.len(),
            conversation.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    if state.is_typing {
        println!("(assistant is typing...)");
    }
    Ok(())
}

async fn show_conversation(id: Option<&str>) -> Result<()> {
    let port = server::ensure_server_running()?;
    let conversation = get_conversation_from_server(port, id).await?;

    println!("# {} ({})", conversation.title, conversation.id);
    for message in &conversation.messages {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M"),
            message.role,
            message.content
        );
    }
    Ok(())
}
