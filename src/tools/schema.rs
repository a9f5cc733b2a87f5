//! Declarative parameter schemas for tools.
//!
//! A `ParameterSpec` is the single source of truth for a tool's arguments:
//! it renders the JSON Schema advertised in `tools/list` and validates the
//! arguments of every `tools/call` before the handler runs. Enum values are
//! only advertised; rejecting an unlisted value is up to the tool.

use rmcp::model::JsonObject;
use serde_json::{Value, json};
use thiserror::Error;

/// Semantic type of a single parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String | ParamKind::Enum(_) => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    required: bool,
    description: String,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::new(name, ParamKind::Enum(values), description)
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn to_json(&self) -> Value {
        let mut property = json!({
            "type": self.kind.json_type(),
            "description": self.description,
        });
        if let ParamKind::Enum(values) = &self.kind {
            property["enum"] = json!(values);
        }
        property
    }

    fn check(&self, value: &Value) -> Result<(), ArgumentError> {
        let ok = match &self.kind {
            // Membership of an enum value is a domain check left to the tool.
            ParamKind::String | ParamKind::Enum(_) => value.is_string(),
            ParamKind::Number => coerce_number(value).is_some(),
            ParamKind::Boolean => value.is_boolean(),
        };

        if ok {
            Ok(())
        } else {
            Err(ArgumentError::wrong_type(&self.name, self.kind.json_type()))
        }
    }
}

/// Ordered set of parameters accepted by a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSpec {
    params: Vec<Parameter>,
}

impl ParameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Declaration order is kept in the rendered schema.
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Render as a JSON Schema object suitable for an MCP `inputSchema`.
    pub fn to_json_schema(&self) -> JsonObject {
        let mut properties = serde_json::Map::new();
        for param in &self.params {
            properties.insert(param.name.clone(), param.to_json());
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        schema
    }

    /// Check `args` against this spec. The first violation found, in
    /// declaration order, is returned. Unknown keys are ignored.
    pub fn validate(&self, args: &ToolArguments) -> Result<(), ArgumentError> {
        for param in &self.params {
            match args.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ArgumentError::Missing(param.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) => param.check(value)?,
            }
        }
        Ok(())
    }
}

/// Why a tool argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("required argument \"{0}\" not found")]
    Missing(String),

    #[error("argument \"{name}\" is not a {expected}")]
    WrongType { name: String, expected: &'static str },
}

impl ArgumentError {
    fn wrong_type(name: &str, expected: &'static str) -> Self {
        Self::WrongType {
            name: name.to_string(),
            expected,
        }
    }
}

/// Arguments of a single tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    inner: JsonObject,
}

impl ToolArguments {
    pub fn new(inner: JsonObject) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ArgumentError> {
        match self.inner.get(name) {
            None | Some(Value::Null) => Err(ArgumentError::Missing(name.to_string())),
            Some(value) => value
                .as_str()
                .ok_or_else(|| ArgumentError::wrong_type(name, "string")),
        }
    }

    /// Numbers may arrive as JSON numbers or as numeric strings.
    pub fn require_f64(&self, name: &str) -> Result<f64, ArgumentError> {
        match self.inner.get(name) {
            None | Some(Value::Null) => Err(ArgumentError::Missing(name.to_string())),
            Some(value) => coerce_number(value).ok_or_else(|| ArgumentError::wrong_type(name, "number")),
        }
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, ArgumentError> {
        match self.inner.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| ArgumentError::wrong_type(name, "boolean")),
        }
    }
}

impl From<JsonObject> for ToolArguments {
    fn from(inner: JsonObject) -> Self {
        Self::new(inner)
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArguments {
        ToolArguments::new(value.as_object().cloned().unwrap())
    }

    fn sample_spec() -> ParameterSpec {
        ParameterSpec::new()
            .param(Parameter::enumeration("mode", "Mode", ["fast", "slow"]).required())
            .param(Parameter::number("count", "How many").required())
            .param(Parameter::string("label", "Optional label"))
            .param(Parameter::boolean("verbose", "Verbose output"))
    }

    #[test]
    fn test_schema_keeps_declaration_order() {
        let schema = sample_spec().to_json_schema();
        let properties = schema["properties"].as_object().unwrap();
        let names: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["mode", "count", "label", "verbose"]);
        assert_eq!(schema["required"], json!(["mode", "count"]));
        assert_eq!(schema["type"], json!("object"));
    }

    #[test]
    fn test_schema_renders_enum_values() {
        let schema = sample_spec().to_json_schema();
        let mode = &schema["properties"]["mode"];
        assert_eq!(mode["type"], json!("string"));
        assert_eq!(mode["enum"], json!(["fast", "slow"]));
        assert_eq!(mode["description"], json!("Mode"));
    }

    #[test]
    fn test_schema_without_required_omits_list() {
        let spec = ParameterSpec::new().param(Parameter::string("label", "Label"));
        assert!(!spec.to_json_schema().contains_key("required"));
    }

    #[test]
    fn test_validate_accepts_conforming_arguments() {
        let spec = sample_spec();
        assert!(spec.validate(&args(json!({"mode": "fast", "count": 3}))).is_ok());
        assert!(
            spec.validate(&args(json!({"mode": "slow", "count": "2.5", "verbose": true})))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_reports_missing_required() {
        let err = sample_spec()
            .validate(&args(json!({"count": 1})))
            .unwrap_err();
        assert_eq!(err, ArgumentError::Missing("mode".to_string()));

        let err = sample_spec()
            .validate(&args(json!({"mode": "fast", "count": null})))
            .unwrap_err();
        assert_eq!(err, ArgumentError::Missing("count".to_string()));
    }

    #[test]
    fn test_validate_rejects_wrong_types() {
        let err = sample_spec()
            .validate(&args(json!({"mode": "fast", "count": "many"})))
            .unwrap_err();
        assert!(matches!(err, ArgumentError::WrongType { ref name, expected: "number" } if name == "count"));

        let err = sample_spec()
            .validate(&args(json!({"mode": "fast", "count": 1, "verbose": "yes"})))
            .unwrap_err();
        assert!(matches!(err, ArgumentError::WrongType { ref name, .. } if name == "verbose"));
    }

    #[test]
    fn test_enum_accepts_any_string_but_not_other_types() {
        let spec = sample_spec();
        assert!(spec.validate(&args(json!({"mode": "medium", "count": 1}))).is_ok());

        let err = spec
            .validate(&args(json!({"mode": 2, "count": 1})))
            .unwrap_err();
        assert!(matches!(err, ArgumentError::WrongType { ref name, expected: "string" } if name == "mode"));
    }

    #[test]
    fn test_accessors() {
        let a = args(json!({"s": "hi", "n": 2, "ns": " 4.5 ", "b": false, "bad": []}));
        assert_eq!(a.require_str("s").unwrap(), "hi");
        assert_eq!(a.require_f64("n").unwrap(), 2.0);
        assert_eq!(a.require_f64("ns").unwrap(), 4.5);
        assert_eq!(a.optional_bool("b").unwrap(), Some(false));
        assert_eq!(a.optional_bool("absent").unwrap(), None);
        assert_eq!(
            a.require_str("absent").unwrap_err(),
            ArgumentError::Missing("absent".to_string())
        );
        assert!(a.require_f64("bad").is_err());
        assert!(a.require_str("n").is_err());
    }

    #[test]
    fn test_non_finite_strings_are_not_numbers() {
        let a = args(json!({"n": "NaN", "m": "inf"}));
        assert!(a.require_f64("n").is_err());
        assert!(a.require_f64("m").is_err());
    }
}
