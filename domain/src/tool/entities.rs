//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request, extracted from model output, to invoke a tool by name.
///
/// Serializes to the JSON wire shape `{"tool": "<name>", "args": {...}}`.
/// Argument order is the order the model wrote them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    #[serde(rename = "tool")]
    pub name: String,
    /// Arguments passed to the tool
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }

    /// Arguments as a JSON object value.
    pub fn args_value(&self) -> Value {
        Value::Object(self.args.clone())
    }
}

/// What the pipeline knows about a registered tool.
///
/// Extracted once at registration; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMeta {
    pub name: String,
    pub description: String,
    /// Raw JSON Schema for the arguments, if the tool declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Rust type name of the tool's input.
    pub input_type: String,
}

impl ToolMeta {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: None,
            input_type: String::new(),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = input_type.into();
        self
    }

    /// Declared JSON Schema `type` of a top-level argument.
    ///
    /// Only a plain string `type` counts; union types (`["string", "null"]`)
    /// return `None`.
    pub fn declared_type(&self, arg: &str) -> Option<&str> {
        self.schema
            .as_ref()?
            .get("properties")?
            .get(arg)?
            .get("type")?
            .as_str()
    }

    /// Whether the schema declares `arg` as a string.
    pub fn declares_string(&self, arg: &str) -> bool {
        self.declared_type(arg) == Some("string")
    }
}
