//! Tools shared by the wire syntax scenario tests.

use crate::schema::JsonSchemaCompiler;
use agentctx_application::{ExecutionContext, Tool, ToolBox, Toolchain, WireSyntax};
use agentctx_domain::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Deserialize, Serialize)]
pub struct SearchInput {
    pub query: String,
}

pub struct Search;

#[async_trait]
impl Tool for Search {
    type Input = SearchInput;
    type Output = String;

    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for a query"
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        }))
    }

    async fn call(&self, _ctx: &ExecutionContext, input: SearchInput) -> Result<String, ToolError> {
        Ok(format!("Results for: {}", input.query))
    }
}

/// Takes no arguments, answers `"a done"`.
pub struct Plain;

#[async_trait]
impl Tool for Plain {
    type Input = Value;
    type Output = String;

    fn name(&self) -> &str {
        "a"
    }

    fn description(&self) -> &str {
        "Does nothing in particular"
    }

    async fn call(&self, _ctx: &ExecutionContext, _input: Value) -> Result<String, ToolError> {
        Ok("a done".to_string())
    }
}

#[derive(Deserialize, Serialize)]
pub struct CountInput {
    pub count: i64,
}

/// Records every handler invocation.
pub struct Count {
    pub invocations: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for Count {
    type Input = CountInput;
    type Output = i64;

    fn name(&self) -> &str {
        "count"
    }

    fn description(&self) -> &str {
        "Return the count"
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"count": {"type": "integer"}},
            "required": ["count"]
        }))
    }

    async fn call(&self, _ctx: &ExecutionContext, input: CountInput) -> Result<i64, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(input.count)
    }
}

/// Echoes its raw arguments; declares `date` and `code` as strings.
pub struct Calendar;

#[async_trait]
impl Tool for Calendar {
    type Input = Value;
    type Output = Value;

    fn name(&self) -> &str {
        "calendar"
    }

    fn description(&self) -> &str {
        "Look up a day"
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "date": {"type": "string"},
                "code": {"type": "string"},
                "days": {"type": "integer"}
            },
            "required": ["date"]
        }))
    }

    async fn call(&self, _ctx: &ExecutionContext, input: Value) -> Result<Value, ToolError> {
        Ok(input)
    }
}

pub fn toolbox(invocations: &Arc<AtomicUsize>) -> ToolBox {
    let mut tools = ToolBox::with_compiler(Arc::new(JsonSchemaCompiler));
    tools
        .register(Search)
        .and_then(|t| t.register(Plain))
        .and_then(|t| t.register(Calendar))
        .and_then(|t| {
            t.register(Count {
                invocations: invocations.clone(),
            })
        })
        .unwrap();
    tools
}

pub fn toolchain(syntax: Arc<dyn WireSyntax>, invocations: &Arc<AtomicUsize>) -> Toolchain {
    Toolchain::new(syntax, Arc::new(toolbox(invocations)))
}
