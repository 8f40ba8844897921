//! Tool port
//!
//! A [`Tool`] declares its concrete input and output types. The pipeline
//! never sees those types: registration wraps each tool once in a
//! [`DynTool`] adapter that speaks `serde_json::Value` on both sides.
//!
//! Inputs are ordinary `serde` types. Lenient timestamp and duration
//! fields opt in through `agentctx_domain::tool::coerce`; a tool that wants
//! the raw arguments uses `serde_json::Value` as its input.

use crate::context::ExecutionContext;
use agentctx_domain::{MediaPart, ToolError, ToolMeta, ToolOutput};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A handler the model can invoke by name.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Deserialize, Serialize)]
/// struct SearchInput { query: String }
///
/// struct Search;
///
/// #[async_trait]
/// impl Tool for Search {
///     type Input = SearchInput;
///     type Output = String;
///
///     fn name(&self) -> &str { "search" }
///     fn description(&self) -> &str { "Search the web" }
///
///     async fn call(&self, _ctx: &ExecutionContext, input: SearchInput) -> Result<String, ToolError> {
///         Ok(format!("Results for: {}", input.query))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Input: DeserializeOwned + Serialize + Send + 'static;
    type Output: Serialize + Send + 'static;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the raw arguments, validated before coercion.
    fn parameter_schema(&self) -> Option<Value> {
        None
    }

    async fn call(
        &self,
        ctx: &ExecutionContext,
        input: Self::Input,
    ) -> Result<Self::Output, ToolError>;

    /// Media to send alongside the serialized output.
    fn attachments(&self, _output: &Self::Output) -> Vec<MediaPart> {
        Vec::new()
    }
}

/// Why an erased invocation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeError {
    /// The arguments did not fit the tool's input type.
    Coercion(String),
    /// The handler ran and returned an error.
    Runtime(ToolError),
}

/// Type-erased view of a registered tool.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn meta(&self) -> &ToolMeta;

    /// Convert raw arguments into the canonical form of the tool's input
    /// type (deserialize, then serialize back).
    fn coerce(&self, args: Value) -> Result<Value, String>;

    /// Run the handler with canonical arguments.
    async fn invoke(&self, ctx: &ExecutionContext, args: Value) -> Result<ToolOutput, InvokeError>;
}
