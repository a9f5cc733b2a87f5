// Core modules
pub mod api;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod server;
pub mod tools;
pub mod transport;
pub mod version;

// Re-export key types and functions
pub use config::{AppConfig, ConfigOverrides, LogConfig, TransportMode};
pub use dispatch::{DispatchError, ServerStats, ToolTable};
pub use logging::{Console, Logging};
pub use server::McpServer;
pub use tools::{RegistryError, ToolContext, ToolHandler, ToolRegistry, ToolSink};

use std::sync::Arc;

use anyhow::Result;
use tools::{CalculateTool, ReverseStringTool};

/// Registry holding every built-in tool, in listing order.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::new()
        .with(CalculateTool::new())?
        .with(ReverseStringTool::new())
}

/// Export `registry` into a fresh dispatch table and wrap it in a server.
pub fn create_server_from(mut registry: ToolRegistry, config: &AppConfig) -> Result<McpServer> {
    let stats = Arc::new(ServerStats::new());
    let mut table = ToolTable::new(config.tool_timeout(), stats);
    let bound = registry.export_to(&mut table)?;
    tracing::info!(tools = ?registry.names(), "Bound {} tools", bound);

    Ok(McpServer::new(Arc::new(table)))
}

/// Convenience function to create a fully configured MCP server.
pub fn create_server(config: &AppConfig) -> Result<McpServer> {
    create_server_from(default_registry()?, config)
}

/// Build the server and serve it over the configured transport.
pub async fn run(config: &AppConfig) -> Result<()> {
    let server = create_server(config)?;
    tracing::info!(
        "Starting MCP server in {} mode on port {}",
        config.mode,
        config.port
    );
    transport::serve(server, config).await
}
