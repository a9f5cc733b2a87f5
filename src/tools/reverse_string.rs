//! Handler for the `reverse_string` tool.

use std::future::Future;
use std::pin::Pin;

use rmcp::model::CallToolResult;

use crate::tools::{
    Parameter, ParameterSpec, ToolArguments, ToolContext, ToolHandler, error_result, text_result,
};

/// Reverse `text` by Unicode scalar value, so multi-byte characters survive.
pub fn reverse(text: &str) -> String {
    text.chars().rev().collect()
}

/// Handler for the `reverse_string` tool.
pub struct ReverseStringTool {
    schema: ParameterSpec,
}

impl ReverseStringTool {
    pub fn new() -> Self {
        Self {
            schema: ParameterSpec::new()
                .param(Parameter::string("text", "The text to reverse").required()),
        }
    }
}

impl Default for ReverseStringTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for ReverseStringTool {
    fn name(&self) -> &str {
        "reverse_string"
    }

    fn description(&self) -> &str {
        "Reverse a string"
    }

    fn schema(&self) -> &ParameterSpec {
        &self.schema
    }

    fn handle(
        &self,
        args: ToolArguments,
        _ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = CallToolResult> + Send + '_>> {
        Box::pin(async move {
            match args.require_str("text") {
                Ok(text) => text_result(reverse(text)),
                Err(e) => error_result(e.to_string()),
            }
        })
    }
}
