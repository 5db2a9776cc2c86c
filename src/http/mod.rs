//! HTTP Transport
//!
//! Axum router exposing the server identity, health and discovery endpoints,
//! the stateless `tools/*` request path, and the SSE notification channel.

pub mod sse;

use crate::mcp::Dispatcher;
use crate::mcp::errors::McpError;
use crate::mcp::protocol::{Implementation, ToolRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use sse::{SessionState, SessionTracker, SseSession};

/// Shared, read-only state handed to every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub server_info: Implementation,
    pub keep_alive: Duration,
    pub sessions: SessionTracker,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl AppState {
    #[inline]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        server_info: Implementation,
        keep_alive: Duration,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            dispatcher,
            server_info,
            keep_alive,
            sessions: SessionTracker::new(),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Ask every open SSE session to finish its stream
    #[inline]
    pub fn shutdown(&self) {
        info!("Closing {} SSE session(s)", self.sessions.active());
        self.shutdown_tx.send_replace(true);
    }

    /// A fresh SSE session bound to this server's keep-alive period and shutdown signal
    #[inline]
    pub fn new_session(&self) -> SseSession {
        SseSession::new(self.sessions.track(), self.keep_alive, self.shutdown_tx.subscribe())
    }
}

/// Any failure on the request/response path: 500 with `{ "error": message }`
#[derive(Debug)]
pub struct ApiError(McpError);

impl From<McpError> for ApiError {
    #[inline]
    fn from(error: McpError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        self.0.log();
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.0.to_error_body())).into_response()
    }
}

/// Build the application router
#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(server_identity))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/tools", get(list_tools))
        .route("/test", get(self_test))
        .route("/sse", get(sse::connect).post(call))
        .route("/mcp", post(call))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn server_identity(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.server_info.name,
        "type": "mcp-server",
        "version": state.server_info.version,
        "endpoints": {
            "health": "/health",
            "status": "/status",
            "tools": "/tools",
            "test": "/test",
            "sse": "/sse",
            "mcp": "/mcp"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp(),
        "server": state.server_info.name
    }))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tools": state.dispatcher.registry().list_tools(),
        "server": state.server_info
    }))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": state.dispatcher.registry().list_tools() }))
}

async fn self_test(State(state): State<AppState>) -> Json<Value> {
    let registry = state.dispatcher.registry();
    Json(json!({
        "message": "MCP server is working",
        "tools": registry.names(),
        "total_tools": registry.len(),
        "timestamp": timestamp()
    }))
}

/// `POST /mcp` and `POST /sse`
async fn call(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: ToolRequest =
        serde_json::from_slice(&body).map_err(|e| McpError::InvalidParameters {
            message: format!("Invalid request body: {}", e),
        })?;

    let result = state.dispatcher.handle(request).await?;
    Ok(Json(result))
}
