//! MCP server implementation using rmcp.
//!
//! `McpServer` is the `ServerHandler` every transport serves. Tool listing
//! and invocation are delegated to the shared [`ToolTable`].

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};

use crate::dispatch::{ServerStats, ToolTable};
use crate::tools::ToolContext;

/// MCP server that handles protocol requests and delegates to tool handlers.
#[derive(Clone)]
pub struct McpServer {
    tools: Arc<ToolTable>,
}

impl McpServer {
    pub fn new(tools: Arc<ToolTable>) -> Self {
        Self { tools }
    }

    /// Get the dispatch table.
    pub fn tools(&self) -> &Arc<ToolTable> {
        &self.tools
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        self.tools.stats()
    }
}

impl ServerHandler for McpServer {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.tools.list_tools(),
            next_cursor: None,
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();
        let tools = self.tools.clone();
        let ctx = ToolContext::new(context.ct.clone());

        async move {
            tracing::debug!(tool = %tool_name, "Handling tool call");
            tools
                .call(&tool_name, args, &ctx)
                .await
                .map_err(|e| {
                    tracing::warn!(tool = %tool_name, "Rejected call: {}", e);
                    e.to_mcp_error()
                })
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "MCP server with multiple transport modes. Offers `calculate` for basic \
                 arithmetic and `reverse_string` for reversing text."
                    .to_string(),
            ),
        }
    }
}
