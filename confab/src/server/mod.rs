//! Confab server - owns the session manager and serves the consumer surface.
//!
//! Architecture:
//! - One server runs at ~/.confab (manages PID/port files)
//! - The server owns the single `SessionManager`; the CLI is a thin client
//!   that talks to it via HTTP
//!
//! Endpoints:
//! - GET  /api/state - Full session snapshot
//! - GET  /api/conversations - List conversations
//! - POST /api/conversations - Create a conversation
//! - GET  /api/conversations/current - Current conversation
//! - GET  /api/conversations/{id} - One conversation
//! - DELETE /api/conversations/{id} - Delete a conversation
//! - POST /api/conversations/{id}/select - Make a conversation current
//! - POST /api/messages - Send a message
//! - WS   /ws - Session events for real-time updates

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::completion::HttpCompletionClient;
use crate::models::Conversation;
use crate::session::{SessionManager, SessionState};

/// Server configuration file paths.
const SERVER_DIR: &str = ".confab";
const PID_FILE: &str = "server.pid";
const PORT_FILE: &str = "server.port";

/// Shared server state.
pub struct ServerState {
    /// The one session manager this process owns.
    sessions: SessionManager,
}

// === Request/Response Types ===

/// Request to create a conversation.
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Optional seed text for the title.
    pub first_message: Option<String>,
}

/// Request to send a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// User message text.
    pub content: String,
}

/// Response after a send settles.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Conversation the reply was addressed to.
    pub conversation_id: String,
}

// === Server Lifecycle ===

/// Start the server.
pub async fn start_server(port: u16, endpoint: String) -> Result<()> {
    let server_dir = get_server_dir()?;
    std::fs::create_dir_all(&server_dir)?;

    let pid = std::process::id();
    std::fs::write(server_dir.join(PID_FILE), pid.to_string())?;
    std::fs::write(server_dir.join(PORT_FILE), port.to_string())?;

    let client = Arc::new(HttpCompletionClient::new(endpoint.clone()));
    let state = Arc::new(ServerState {
        sessions: SessionManager::new(client),
    });

    let app = Router::new()
        .route("/api/state", get(get_state))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route("/api/conversations/current", get(current_conversation))
        .route(
            "/api/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/api/conversations/{id}/select", post(select_conversation))
        .route("/api/messages", post(send_message))
        .route("/ws", get(websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, %endpoint, "confab server starting");
    println!("Confab server starting on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await.context("Server error")?;

    let _ = std::fs::remove_file(server_dir.join(PID_FILE));
    let _ = std::fs::remove_file(server_dir.join(PORT_FILE));

    Ok(())
}

fn get_server_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(SERVER_DIR))
}

/// Port of a running server, if one is alive.
pub fn get_server_port() -> Option<u16> {
    let server_dir = get_server_dir().ok()?;
    let pid_file = server_dir.join(PID_FILE);
    let port_file = server_dir.join(PORT_FILE);

    if let Ok(pid_str) = std::fs::read_to_string(&pid_file) {
        if let Ok(pid) = pid_str.trim().parse::<u32>() {
            #[cfg(unix)]
            {
                use std::process::Command;
                let output = Command::new("kill").args(["-0", &pid.to_string()]).output();
                if output.map(|o| o.status.success()).unwrap_or(false) {
                    if let Ok(port_str) = std::fs::read_to_string(&port_file) {
                        return port_str.trim().parse().ok();
                    }
                }
            }
            #[cfg(not(unix))]
            {
                if let Ok(port_str) = std::fs::read_to_string(&port_file) {
                    return port_str.trim().parse().ok();
                }
            }
        }
    }
    None
}

/// Spawn a detached server process.
pub fn spawn_server_daemon(port: u16) -> Result<()> {
    use std::process::{Command, Stdio};

    let exe = std::env::current_exe()?;

    #[cfg(unix)]
    {
        Command::new(&exe)
            .args(["serve", "--port", &port.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn server daemon")?;
    }

    #[cfg(not(unix))]
    {
        Command::new(&exe)
            .args(["serve", "--port", &port.to_string()])
            .spawn()
            .context("Failed to spawn server daemon")?;
    }

    std::thread::sleep(std::time::Duration::from_millis(500));
    Ok(())
}

/// Find a running server or spawn one.
///
/// The spawned daemon reads its completion endpoint from `CONFAB_ENDPOINT`;
/// without it the daemon exits and this reports the startup failure.
pub fn ensure_server_running() -> Result<u16> {
    if let Some(port) = get_server_port() {
        return Ok(port);
    }

    let port = 58464;
    spawn_server_daemon(port)?;

    for _ in 0..20 {
        if let Some(p) = get_server_port() {
            return Ok(p);
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    anyhow::bail!("Server failed to start (is CONFAB_ENDPOINT set?)")
}

// === Handlers ===

async fn get_state(State(state): State<Arc<ServerState>>) -> Json<SessionState> {
    Json(state.sessions.snapshot().await)
}

async fn list_conversations(State(state): State<Arc<ServerState>>) -> Json<Vec<Conversation>> {
    Json(state.sessions.conversations().await)
}

async fn create_conversation(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CreateConversationRequest>,
) -> Json<Conversation> {
    let created = state
        .sessions
        .create_conversation(req.first_message.as_deref())
        .await;
    Json(created)
}

async fn current_conversation(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Conversation>, StatusCode> {
    state
        .sessions
        .current_conversation()
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, StatusCode> {
    state
        .sessions
        .conversation(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if state.sessions.delete_conversation(&id).await {
        Ok(Json(serde_json::json!({"success": true})))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn select_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if state.sessions.select_conversation(&id).await {
        Ok(Json(serde_json::json!({"success": true})))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn send_message(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let conversation_id = state.sessions.send_message(&req.content).await;
    Ok(Json(SendMessageResponse { conversation_id }))
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(mut socket: axum::extract::ws::WebSocket, state: Arc<ServerState>) {
    use axum::extract::ws::Message;

    let mut rx = state.sessions.subscribe();

    while let Ok(event) = rx.recv().await {
        if let Ok(json) = serde_json::to_string(&event) {
            if socket.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    }
}
