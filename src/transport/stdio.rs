use anyhow::Result;
use rmcp::service::ServiceExt;
use rmcp::transport::stdio;
use tracing::info;

use crate::server::McpServer;

/// Serve a single MCP session over stdin/stdout until the client goes away.
pub async fn serve(server: McpServer) -> Result<()> {
    info!("Starting MCP server in stdio mode");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

    // Block until the MCP session ends.
    let reason = service.waiting().await?;
    info!("MCP stdio session ended: {:?}", reason);
    Ok(())
}
