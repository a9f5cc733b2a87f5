//! Handler for the `calculate` tool.
//!
//! Applies one of four arithmetic operations to two numbers and returns the
//! result with two decimal places.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use rmcp::model::CallToolResult;
use thiserror::Error;

use crate::tools::{
    ArgumentError, Parameter, ParameterSpec, ToolArguments, ToolContext, ToolHandler, error_result,
    text_result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> Result<f64, CalculateError> {
        match self {
            Operation::Add => Ok(x + y),
            Operation::Subtract => Ok(x - y),
            Operation::Multiply => Ok(x * y),
            Operation::Divide if y == 0.0 => Err(CalculateError::DivideByZero),
            Operation::Divide => Ok(x / y),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CalculateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CalculateError::UnknownOperation(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculateError {
    #[error("cannot divide by zero")]
    DivideByZero,

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

/// Format a result the way the tool reports it.
pub fn format_result(value: f64) -> String {
    format!("{:.2}", value)
}

/// Handler for the `calculate` tool.
pub struct CalculateTool {
    schema: ParameterSpec,
}

impl CalculateTool {
    pub fn new() -> Self {
        let schema = ParameterSpec::new()
            .param(
                Parameter::enumeration(
                    "operation",
                    "The operation to perform (add, subtract, multiply, divide)",
                    Operation::ALL.iter().map(Operation::as_str),
                )
                .required(),
            )
            .param(Parameter::number("x", "First number").required())
            .param(Parameter::number("y", "Second number").required());

        Self { schema }
    }

    fn compute(args: &ToolArguments) -> Result<String, CalculateError> {
        let op: Operation = args.require_str("operation")?.parse()?;
        let x = args.require_f64("x")?;
        let y = args.require_f64("y")?;
        op.apply(x, y).map(format_result)
    }
}

impl Default for CalculateTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic operations"
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
            match Self::compute(&args) {
                Ok(text) => text_result(text),
                Err(e) => {
                    tracing::debug!(error = %e, "calculate rejected input");
                    error_result(e.to_string())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::RawContent;
    use serde_json::{Value, json};

    async fn call(args: Value) -> CallToolResult {
        let args = ToolArguments::new(args.as_object().cloned().unwrap());
        CalculateTool::new()
            .handle(args, &ToolContext::detached())
            .await
    }

    fn text_of(result: &CallToolResult) -> String {
        match &result.content[0].raw {
            RawContent::Text(t) => t.text.clone(),
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_operations() {
        let cases = [
            ("add", 1.5, 2.25, "3.75"),
            ("subtract", 10.0, 4.0, "6.00"),
            ("multiply", -3.0, 2.5, "-7.50"),
            ("divide", 7.0, 2.0, "3.50"),
            ("divide", 1.0, 3.0, "0.33"),
            ("divide", 2.0, 3.0, "0.67"),
        ];

        for (op, x, y, expected) in cases {
            let result = call(json!({"operation": op, "x": x, "y": y})).await;
            assert_eq!(result.is_error, Some(false), "{} {} {}", op, x, y);
            assert_eq!(text_of(&result), expected, "{} {} {}", op, x, y);
        }
    }

    #[test]
    fn test_divide_matches_plain_division() {
        for (x, y) in [(9.0, 4.0), (-5.0, 8.0), (100.0, 7.0), (0.0, -3.0), (1e6, 0.5)] {
            let value = Operation::Divide.apply(x, y).unwrap();
            assert_eq!(format_result(value), format!("{:.2}", x / y));
        }
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_an_error_result() {
        for x in [0.0, 1.0, -42.5] {
            let result = call(json!({"operation": "divide", "x": x, "y": 0})).await;
            assert_eq!(result.is_error, Some(true));
            assert_eq!(text_of(&result), "cannot divide by zero");
        }

        let result = call(json!({"operation": "divide", "x": 1, "y": -0.0})).await;
        assert_eq!(text_of(&result), "cannot divide by zero");
    }

    #[tokio::test]
    async fn test_unknown_operation_is_named() {
        let result = call(json!({"operation": "modulo", "x": 5, "y": 3})).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "unknown operation: modulo");

        // The tool keeps working afterwards.
        let result = call(json!({"operation": "add", "x": 5, "y": 3})).await;
        assert_eq!(text_of(&result), "8.00");
    }

    #[tokio::test]
    async fn test_missing_and_malformed_arguments() {
        let result = call(json!({"operation": "add", "x": 1})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("\"y\""));

        let result = call(json!({"operation": "add", "x": "one", "y": 1})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("not a number"));
    }

    #[tokio::test]
    async fn test_numeric_strings_are_coerced() {
        let result = call(json!({"operation": "multiply", "x": "2", "y": "4.5"})).await;
        assert_eq!(text_of(&result), "9.00");
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!("add".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("divide".parse::<Operation>().unwrap(), Operation::Divide);
        assert_eq!(
            "ADD".parse::<Operation>().unwrap_err(),
            CalculateError::UnknownOperation("ADD".to_string())
        );
    }

    #[test]
    fn test_schema_lists_operations() {
        let tool = CalculateTool::new();
        let schema = tool.input_schema();
        assert_eq!(
            schema["properties"]["operation"]["enum"],
            json!(["add", "subtract", "multiply", "divide"])
        );
        assert_eq!(schema["required"], json!(["operation", "x", "y"]));
    }
}
