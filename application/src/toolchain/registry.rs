//! Tool registry — metadata extraction and erasure at registration time.
//!
//! Registration does all per-tool work once: read name, description and
//! schema off the tool, compile the schema, and wrap the tool in an
//! adapter that converts between `serde_json::Value` and its concrete
//! input/output types. After that the box is read-only and needs no
//! locking.

use crate::context::ExecutionContext;
use crate::ports::schema::{SchemaCompiler, SchemaValidator};
use crate::ports::tool::{DynTool, InvokeError, Tool};
use agentctx_domain::{ToolError, ToolMeta, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),

    #[error("tool name must not be empty")]
    EmptyName,

    #[error("schema for tool '{tool}' does not compile: {message}")]
    InvalidSchema { tool: String, message: String },
}

/// Adapter from a typed [`Tool`] to [`DynTool`].
struct ErasedTool<T: Tool> {
    tool: T,
    meta: ToolMeta,
}

impl<T: Tool> ErasedTool<T> {
    fn new(tool: T) -> Self {
        let mut meta = ToolMeta::new(tool.name(), tool.description())
            .with_input_type(std::any::type_name::<T::Input>());
        if let Some(schema) = tool.parameter_schema() {
            meta = meta.with_schema(schema);
        }
        Self { tool, meta }
    }

    fn decode(args: Value) -> Result<T::Input, String> {
        serde_json::from_value(args).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl<T: Tool> DynTool for ErasedTool<T> {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    fn coerce(&self, args: Value) -> Result<Value, String> {
        let input = Self::decode(args)?;
        serde_json::to_value(&input).map_err(|e| e.to_string())
    }

    async fn invoke(&self, ctx: &ExecutionContext, args: Value) -> Result<ToolOutput, InvokeError> {
        let input = Self::decode(args).map_err(InvokeError::Coercion)?;
        let output = self
            .tool
            .call(ctx, input)
            .await
            .map_err(InvokeError::Runtime)?;
        let media = self.tool.attachments(&output);
        let value = serde_json::to_value(&output).map_err(|e| {
            InvokeError::Runtime(
                ToolError::new("tool output could not be serialized").with_details(e.to_string()),
            )
        })?;
        Ok(ToolOutput::new(value).with_media(media))
    }
}

/// A registered tool with its compiled schema.
#[derive(Clone)]
pub struct RegisteredTool {
    handler: Arc<dyn DynTool>,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl RegisteredTool {
    pub fn meta(&self) -> &ToolMeta {
        self.handler.meta()
    }

    pub fn handler(&self) -> &dyn DynTool {
        self.handler.as_ref()
    }

    pub fn validator(&self) -> Option<&dyn SchemaValidator> {
        self.validator.as_deref()
    }
}

/// Name → tool map used by the toolchain.
///
/// Without a [`SchemaCompiler`] declared schemas are kept as metadata
/// (syntaxes still read argument types from them) but not enforced.
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: BTreeMap<String, RegisteredTool>,
    compiler: Option<Arc<dyn SchemaCompiler>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(compiler: Arc<dyn SchemaCompiler>) -> Self {
        Self {
            tools: BTreeMap::new(),
            compiler: Some(compiler),
        }
    }

    /// Register a typed tool.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<&mut Self, RegistryError> {
        self.register_dyn(Arc::new(ErasedTool::new(tool)))
    }

    /// Register an already-erased tool.
    pub fn register_dyn(&mut self, handler: Arc<dyn DynTool>) -> Result<&mut Self, RegistryError> {
        let meta = handler.meta();
        if meta.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&meta.name) {
            return Err(RegistryError::Duplicate(meta.name.clone()));
        }

        let validator = match (&self.compiler, &meta.schema) {
            (Some(compiler), Some(schema)) => Some(Arc::from(compiler.compile(schema).map_err(
                |e| RegistryError::InvalidSchema {
                    tool: meta.name.clone(),
                    message: e.to_string(),
                },
            )?)),
            _ => None,
        };

        debug!(
            tool = %meta.name,
            input_type = %meta.input_type,
            validated = validator.is_some(),
            "tool registered"
        );
        let name = meta.name.clone();
        self.tools.insert(name, RegisteredTool { handler, validator });
        Ok(self)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Result<Self, RegistryError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn meta(&self, name: &str) -> Option<&ToolMeta> {
        self.tools.get(name).map(RegisteredTool::meta)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn metas(&self) -> impl Iterator<Item = &ToolMeta> {
        self.tools.values().map(RegisteredTool::meta)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("compiler", &self.compiler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::ports::schema::SchemaError;
    use agentctx_domain::tool::coerce::{Timestamp, duration};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Deserialize, Serialize)]
    struct BookInput {
        title: String,
        start: Timestamp,
        #[serde(with = "duration")]
        length: Duration,
    }

    struct Book;

    #[async_trait]
    impl Tool for Book {
        type Input = BookInput;
        type Output = String;

        fn name(&self) -> &str {
            "book"
        }

        fn description(&self) -> &str {
            "Book a meeting"
        }

        fn parameter_schema(&self) -> Option<Value> {
            Some(json!({
                "type": "object",
                "properties": {"title": {"type": "string"}},
                "required": ["title"]
            }))
        }

        async fn call(&self, _ctx: &ExecutionContext, input: BookInput) -> Result<String, ToolError> {
            Ok(format!(
                "{} at {} for {}s",
                input.title,
                input.start,
                input.length.as_secs()
            ))
        }
    }

    struct Raw;

    #[async_trait]
    impl Tool for Raw {
        type Input = Value;
        type Output = Value;

        fn name(&self) -> &str {
            "raw"
        }

        fn description(&self) -> &str {
            "Echo arguments untouched"
        }

        async fn call(&self, _ctx: &ExecutionContext, input: Value) -> Result<Value, ToolError> {
            Ok(input)
        }
    }

    struct RejectAll;

    struct Rejecting;

    impl SchemaValidator for Rejecting {
        fn validate(&self, _value: &Value) -> Result<(), SchemaError> {
            Err(SchemaError::Invalid("nope".into()))
        }
    }

    impl SchemaCompiler for RejectAll {
        fn compile(&self, schema: &Value) -> Result<Box<dyn SchemaValidator>, SchemaError> {
            if schema.get("type").is_none() {
                return Err(SchemaError::Compile("missing type".into()));
            }
            Ok(Box::new(Rejecting))
        }
    }

    #[test]
    fn test_meta_is_extracted_once() {
        let tools = ToolBox::new().with_tool(Book).unwrap().with_tool(Raw).unwrap();
        let meta = tools.meta("book").unwrap();
        assert_eq!(meta.description, "Book a meeting");
        assert!(meta.declares_string("title"));
        assert!(meta.input_type.ends_with("BookInput"));
        assert!(tools.meta("raw").unwrap().schema.is_none());
        assert_eq!(tools.names(), vec!["book", "raw"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut tools = ToolBox::new();
        tools.register(Raw).unwrap();
        assert_eq!(
            tools.register(Raw).err(),
            Some(RegistryError::Duplicate("raw".into()))
        );
    }

    #[test]
    fn test_schema_compiled_at_registration() {
        let tools = ToolBox::with_compiler(Arc::new(RejectAll))
            .with_tool(Book)
            .unwrap();
        assert!(tools.get("book").unwrap().validator().is_some());
        assert!(ToolBox::new().with_tool(Book).unwrap().get("book").unwrap().validator().is_none());
    }

    #[test]
    fn test_coerce_produces_canonical_args() {
        let tools = ToolBox::new().with_tool(Book).unwrap();
        let handler = tools.get("book").unwrap().handler();
        let canonical = handler
            .coerce(json!({"title": "sync", "start": "2026-01-20", "length": "1h30m"}))
            .unwrap();
        assert_eq!(canonical["start"], "2026-01-20T00:00:00+00:00");
        assert_eq!(canonical["length"], "1h 30m");

        let err = handler
            .coerce(json!({"title": "sync", "start": "someday", "length": "1h"}))
            .unwrap_err();
        assert!(err.contains("timestamp"));
    }

    #[tokio::test]
    async fn test_invoke_dispatches_typed_input() {
        let tools = ToolBox::new().with_tool(Book).unwrap().with_tool(Raw).unwrap();
        let ctx = ExecutionContext::new("run", RunConfig::default());

        let out = tools
            .get("book")
            .unwrap()
            .handler()
            .invoke(
                &ctx,
                json!({"title": "sync", "start": "2026-01-20T10:30:00+05:00", "length": 90}),
            )
            .await
            .unwrap();
        assert_eq!(out, "sync at 2026-01-20T10:30:00+05:00 for 90s");

        let raw = tools
            .get("raw")
            .unwrap()
            .handler()
            .invoke(&ctx, json!({"anything": [1, {"deep": true}]}))
            .await
            .unwrap();
        assert_eq!(raw.value, json!({"anything": [1, {"deep": true}]}));
    }
}
