//! Tool registry for managing MCP tool handlers.
//!
//! Provides a `ToolHandler` trait for implementing tools, a `ToolRegistry`
//! that owns them in registration order, and the `ToolSink` seam through
//! which the registry hands its tools to a dispatcher exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject, Tool as McpTool};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::schema::{ParameterSpec, ToolArguments};

/// Context passed to tool handlers during execution.
#[derive(Clone, Default)]
pub struct ToolContext {
    cancellation: CancellationToken,
}

impl ToolContext {
    /// Build a context bound to the caller's cancellation token.
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// A context that is never cancelled by a caller.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Token that fires when the caller abandons the request.
    ///
    /// Handlers that wait on I/O must select on this and give up with an
    /// error result instead of hanging.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Trait for handling MCP tool invocations.
///
/// Each tool implements this trait to define its schema and execution logic.
/// `handle` never fails: bad input and domain errors come back as an error
/// `CallToolResult` so the transport can report them to the remote caller.
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's name (e.g., "calculate").
    fn name(&self) -> &str;

    /// Returns the tool's human-readable title.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Returns the tool's description.
    fn description(&self) -> &str;

    /// Returns the declarative parameter specification.
    fn schema(&self) -> &ParameterSpec;

    /// Executes the tool with the given arguments.
    fn handle(
        &self,
        args: ToolArguments,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = CallToolResult> + Send + '_>>;

    /// Returns the input schema for this tool.
    fn input_schema(&self) -> JsonObject {
        self.schema().to_json_schema()
    }

    /// Converts this handler to an `McpTool` for use in `list_tools`.
    fn to_mcp_tool(&self) -> McpTool {
        use std::borrow::Cow;

        McpTool {
            name: Cow::Owned(self.name().to_string()),
            title: self.title().map(|s| s.to_string()),
            description: Some(Cow::Owned(self.description().to_string())),
            input_schema: Arc::new(self.input_schema()),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

/// Successful text result.
pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Error result carrying a human-readable message.
pub fn error_result(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

/// Receiver of exported tools, typically a server's dispatch table.
pub trait ToolSink {
    fn bind(&mut self, tool: McpTool, handler: Arc<dyn ToolHandler>);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool \"{0}\" is already registered")]
    DuplicateTool(String),

    #[error("tool name must not be empty")]
    EmptyName,

    #[error("cannot register tool \"{0}\": registry has already been exported")]
    Sealed(String),

    #[error("registry has already been exported")]
    AlreadyExported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Exported,
}

/// Registry for managing tool handlers.
///
/// Entries keep registration order and names are unique. Once exported the
/// registry is sealed.
pub struct ToolRegistry {
    entries: Vec<Arc<dyn ToolHandler>>,
    phase: Phase,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            phase: Phase::Open,
        }
    }

    /// Register a shared tool handler.
    pub fn register_arc(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let name = handler.name();
        if self.phase == Phase::Exported {
            return Err(RegistryError::Sealed(name.to_string()));
        }
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(name) {
            return Err(RegistryError::DuplicateTool(name.to_string()));
        }

        tracing::debug!(tool = %name, "Registered tool");
        self.entries.push(handler);
        Ok(())
    }

    /// Register a tool handler from a type that implements `ToolHandler`.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(handler))
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: ToolHandler + 'static>(mut self, handler: T) -> Result<Self, RegistryError> {
        self.register(handler)?;
        Ok(self)
    }

    /// All registered handlers in registration order.
    pub fn list(&self) -> &[Arc<dyn ToolHandler>] {
        &self.entries
    }

    /// Get a tool handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.entries.iter().find(|h| h.name() == name).cloned()
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|h| h.name().to_string()).collect()
    }

    /// Check if a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|h| h.name() == name)
    }

    /// Return the number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_exported(&self) -> bool {
        self.phase == Phase::Exported
    }

    /// Bind every tool into `sink`, in registration order, and seal the
    /// registry. Returns the number of bindings made.
    pub fn export_to(&mut self, sink: &mut dyn ToolSink) -> Result<usize, RegistryError> {
        if self.phase == Phase::Exported {
            return Err(RegistryError::AlreadyExported);
        }

        for handler in &self.entries {
            sink.bind(handler.to_mcp_tool(), handler.clone());
        }
        self.phase = Phase::Exported;

        tracing::debug!(count = self.entries.len(), "Exported tool registry");
        Ok(self.entries.len())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
