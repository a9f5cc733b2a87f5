//! Transport bootstrap for the three supported modes.

pub mod http;
pub mod sse;
pub mod stdio;

use anyhow::Result;

use crate::config::{AppConfig, TransportMode};
use crate::server::McpServer;

/// Serve `server` over the transport selected in `config`. Returns when the
/// transport stops; bind and serve failures are returned to the caller.
pub async fn serve(server: McpServer, config: &AppConfig) -> Result<()> {
    match config.mode {
        TransportMode::Stdio => stdio::serve(server).await,
        TransportMode::Sse => sse::serve(server, &config.bind_address()).await,
        TransportMode::StreamableHttp => http::serve(server, &config.bind_address()).await,
    }
}
