//! Server-side dispatch table.
//!
//! `ToolTable` is the [`ToolSink`] a registry exports into. It answers
//! `tools/list` and routes `tools/call` to the bound handler, enforcing the
//! invocation contract: argument validation, cancellation, a per-call
//! timeout and panic containment all surface as error results.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, JsonObject, Tool as McpTool};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::tools::{ToolArguments, ToolContext, ToolHandler, ToolSink, error_result};

/// Counters shared by the dispatch table and the HTTP surfaces.
#[derive(Debug, Default)]
pub struct ServerStats {
    tool_calls: AtomicU64,
    tool_errors: AtomicU64,
    active_sessions: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub tool_calls: u64,
    pub tool_errors: u64,
    pub active_sessions: u64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_errors: self.tool_errors.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),
}

impl DispatchError {
    /// Convert to a JSON-RPC error for the protocol response.
    pub fn to_mcp_error(&self) -> McpError {
        match self {
            Self::UnknownTool(_) => McpError::invalid_params(self.to_string(), None),
        }
    }
}

struct Binding {
    tool: McpTool,
    handler: Arc<dyn ToolHandler>,
}

/// Dispatch table built from an exported registry.
pub struct ToolTable {
    bindings: Vec<Binding>,
    index: HashMap<String, usize>,
    timeout: Duration,
    stats: Arc<ServerStats>,
}

impl ToolTable {
    pub fn new(timeout: Duration, stats: Arc<ServerStats>) -> Self {
        Self {
            bindings: Vec::new(),
            index: HashMap::new(),
            timeout,
            stats,
        }
    }

    /// Tool descriptors in binding order.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.bindings.iter().map(|b| b.tool.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Invoke the tool bound as `name`.
    ///
    /// Only an unknown tool name is reported as `Err`; every failure of a
    /// known tool becomes an error `CallToolResult`.
    pub async fn call(
        &self,
        name: &str,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, DispatchError> {
        let binding = self
            .index
            .get(name)
            .and_then(|&i| self.bindings.get(i))
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);

        let args = ToolArguments::from(args);
        let result = match binding.handler.schema().validate(&args) {
            Ok(()) => self.run(name, binding.handler.clone(), args, ctx).await,
            Err(e) => {
                debug!(tool = %name, error = %e, "Rejected tool arguments");
                error_result(e.to_string())
            }
        };

        if result.is_error == Some(true) {
            self.stats.tool_errors.fetch_add(1, Ordering::Relaxed);
        }
        Ok(result)
    }

    async fn run(
        &self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
        args: ToolArguments,
        ctx: &ToolContext,
    ) -> CallToolResult {
        let task_ctx = ctx.clone();
        let mut task = tokio::spawn(async move { handler.handle(args, &task_ctx).await });

        tokio::select! {
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %name, error = %e, "Tool task failed");
                    error_result(format!("tool '{}' failed unexpectedly", name))
                }
            },
            _ = ctx.cancellation().cancelled() => {
                task.abort();
                debug!(tool = %name, "Tool call cancelled by caller");
                error_result("request cancelled")
            }
            _ = tokio::time::sleep(self.timeout) => {
                task.abort();
                warn!(tool = %name, timeout_secs = self.timeout.as_secs(), "Tool call timed out");
                error_result(format!(
                    "tool '{}' timed out after {}s",
                    name,
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

impl ToolSink for ToolTable {
    fn bind(&mut self, tool: McpTool, handler: Arc<dyn ToolHandler>) {
        let name = tool.name.to_string();
        match self.index.get(&name) {
            // The registry guarantees unique names; a rebind replaces in place.
            Some(&i) => self.bindings[i] = Binding { tool, handler },
            None => {
                self.index.insert(name, self.bindings.len());
                self.bindings.push(Binding { tool, handler });
            }
        }
    }
}
