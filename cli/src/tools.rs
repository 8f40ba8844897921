//! Built-in demo tools for transcript replay.

use agentctx_application::{ExecutionContext, RegistryError, Tool, ToolBox};
use agentctx_domain::ToolError;
use agentctx_domain::tool::coerce::{Timestamp, duration};
use agentctx_infrastructure::JsonSchemaCompiler;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize)]
pub struct EchoInput {
    pub text: String,
}

/// Returns its text unchanged.
pub struct Echo;

#[async_trait]
impl Tool for Echo {
    type Input = EchoInput;
    type Output = String;

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the given text"
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }))
    }

    async fn call(&self, _ctx: &ExecutionContext, input: EchoInput) -> Result<String, ToolError> {
        Ok(input.text)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AddInput {
    pub numbers: Vec<f64>,
}

/// Sums a list of numbers.
pub struct Add;

#[async_trait]
impl Tool for Add {
    type Input = AddInput;
    type Output = f64;

    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add a list of numbers"
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "numbers": {"type": "array", "items": {"type": "number"}, "minItems": 1}
            },
            "required": ["numbers"]
        }))
    }

    async fn call(&self, _ctx: &ExecutionContext, input: AddInput) -> Result<f64, ToolError> {
        let sum: f64 = input.numbers.iter().sum();
        if !sum.is_finite() {
            return Err(ToolError::new("sum overflowed"));
        }
        Ok(sum)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WaitUntilInput {
    /// Any accepted timestamp form, `2026-01-20` included.
    pub at: Timestamp,
    /// Longest the tool will wait, e.g. `500ms` or `1m30s`.
    #[serde(with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct WaitUntilOutput {
    pub reached: bool,
    pub waited_ms: u64,
}

/// Sleeps until a timestamp, bounded by a timeout and by cancellation.
pub struct WaitUntil;

#[async_trait]
impl Tool for WaitUntil {
    type Input = WaitUntilInput;
    type Output = WaitUntilOutput;

    fn name(&self) -> &str {
        "wait_until"
    }

    fn description(&self) -> &str {
        "Wait until a point in time, giving up after a timeout"
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "at": {"type": "string"},
                "timeout": {"type": ["string", "number"]}
            },
            "required": ["at", "timeout"]
        }))
    }

    async fn call(
        &self,
        ctx: &ExecutionContext,
        input: WaitUntilInput,
    ) -> Result<WaitUntilOutput, ToolError> {
        let remaining = (input.at.to_utc() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let wait = remaining.min(input.timeout);

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(WaitUntilOutput {
                reached: remaining <= input.timeout,
                waited_ms: wait.as_millis() as u64,
            }),
            _ = ctx.cancelled() => Err(ToolError::new("wait interrupted").with_details("run cancelled")),
        }
    }
}

/// Registry with every demo tool, schemas enforced.
pub fn demo_toolbox() -> Result<ToolBox, RegistryError> {
    ToolBox::with_compiler(Arc::new(JsonSchemaCompiler))
        .with_tool(Echo)?
        .with_tool(Add)?
        .with_tool(WaitUntil)
}
