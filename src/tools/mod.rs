//! Tool handler registry for managing MCP tool implementations.
//!
//! Tools describe themselves with a [`ParameterSpec`] and implement
//! [`ToolHandler`]. A [`ToolRegistry`] collects them at startup and exports
//! them once into a [`ToolSink`].

mod registry;
mod schema;

pub use registry::{
    RegistryError, ToolContext, ToolHandler, ToolRegistry, ToolSink, error_result, text_result,
};
pub use schema::{ArgumentError, Parameter, ParameterSpec, ToolArguments};

// Tool handler implementations
mod calculate;
mod reverse_string;

pub use calculate::{CalculateError, CalculateTool, Operation};
pub use reverse_string::ReverseStringTool;
