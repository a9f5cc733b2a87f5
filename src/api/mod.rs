// Operational HTTP endpoints served next to the MCP transports

use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::TransportMode;
use crate::dispatch::ServerStats;

pub const SERVICE_NAME: &str = "MCP Server";

#[derive(Clone)]
pub struct ApiState {
    pub mode: TransportMode,
    pub stats: Arc<ServerStats>,
    /// Session store of the streamable HTTP transport. When set, it is the
    /// source of `active_sessions`.
    pub http_sessions: Option<Arc<LocalSessionManager>>,
}

impl ApiState {
    pub fn new(mode: TransportMode, stats: Arc<ServerStats>) -> Self {
        Self {
            mode,
            stats,
            http_sessions: None,
        }
    }

    pub fn with_http_sessions(mut self, sessions: Arc<LocalSessionManager>) -> Self {
        self.http_sessions = Some(sessions);
        self
    }
}

/// Health, metrics and index routes for an HTTP transport.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Wrap a fully assembled router with request tracing and permissive CORS.
pub fn with_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

/// Paths clients use for the given transport.
pub fn endpoints(mode: TransportMode) -> Value {
    match mode {
        TransportMode::Sse => serde_json::json!({
            "sse": "/sse",
            "message": "/message",
            "health": "/health",
            "metrics": "/metrics",
        }),
        TransportMode::StreamableHttp | TransportMode::Stdio => serde_json::json!({
            "mcp": "/mcp",
            "health": "/health",
            "metrics": "/metrics",
        }),
    }
}

async fn index(State(state): State<ApiState>) -> Json<Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "mode": state.mode,
        "endpoints": endpoints(state.mode),
    }))
}

async fn health_check(State(state): State<ApiState>) -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "mode": state.mode,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn metrics(State(state): State<ApiState>) -> Json<Value> {
    let mut snapshot = state.stats.snapshot();
    if let Some(manager) = &state.http_sessions {
        snapshot.active_sessions = manager.sessions.read().await.len() as u64;
    }

    Json(serde_json::json!({
        "status": "ok",
        "metrics": snapshot,
    }))
}
