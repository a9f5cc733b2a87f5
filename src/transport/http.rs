use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};

use crate::api::{self, ApiState};
use crate::config::TransportMode;
use crate::server::McpServer;

/// Build the streamable HTTP router: the MCP endpoint at `/mcp` plus the
/// operational routes.
pub fn router(server: McpServer) -> Router {
    let sessions = Arc::new(LocalSessionManager::default());
    let state = ApiState::new(TransportMode::StreamableHttp, server.stats().clone())
        .with_http_sessions(sessions.clone());

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        sessions,
        Default::default(),
    );

    api::with_layers(
        Router::new()
            .nest_service("/mcp", service)
            .merge(api::create_router(state)),
    )
}

/// Serve the MCP streamable HTTP transport on `bind`.
pub async fn serve(server: McpServer, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("MCP HTTP server listening on http://{}/mcp", bind);

    axum::serve(listener, router(server)).await?;
    Ok(())
}
