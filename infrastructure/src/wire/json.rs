//! JSON tool-call syntax.

use super::strip_code_fence;
use agentctx_application::{ToolBox, WireSyntax};
use agentctx_domain::{ToolCall, ToolCallError, ToolOutput, ToolchainError};
use serde_json::{Map, Value, json};

const SYNTAX: &str = "json";

/// `{"tool": "<name>", "args": {...}}`, or an array of those.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSyntax;

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build a call from one decoded call object.
///
/// Shared by the YAML syntax, which decodes into the same shape.
pub(crate) fn call_from_value(
    syntax: &'static str,
    index: usize,
    item: Value,
) -> Result<ToolCall, ToolchainError> {
    let Value::Object(mut map) = item else {
        return Err(ToolchainError::invalid(
            syntax,
            format!("call #{} is {}, expected an object", index, json_type(&item)),
        ));
    };

    let name = match map.remove("tool") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return Err(ToolchainError::MissingToolName { index }),
    };

    let args = match map.remove("args") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args,
        Some(other) => {
            return Err(ToolchainError::invalid(
                syntax,
                format!(
                    "args of call #{} ('{}') is {}, expected an object",
                    index,
                    name,
                    json_type(&other)
                ),
            ));
        }
    };

    Ok(ToolCall { name, args })
}

/// Split a decoded document into call objects.
pub(crate) fn calls_from_document(
    syntax: &'static str,
    document: Value,
) -> Result<Vec<ToolCall>, ToolchainError> {
    let items = match document {
        Value::Object(_) => vec![document],
        Value::Array(items) => items,
        other => {
            return Err(ToolchainError::invalid(
                syntax,
                format!(
                    "expected a call object or a list of them, found {}",
                    json_type(&other)
                ),
            ));
        }
    };
    if items.is_empty() {
        return Err(ToolchainError::NoSections);
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| call_from_value(syntax, index, item))
        .collect()
}

impl WireSyntax for JsonSyntax {
    fn name(&self) -> &'static str {
        SYNTAX
    }

    fn parse_calls(&self, raw: &str, _tools: &ToolBox) -> Result<Vec<ToolCall>, ToolchainError> {
        let document: Value = serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| ToolchainError::invalid(SYNTAX, e.to_string()))?;
        calls_from_document(SYNTAX, document)
    }

    fn render_output(&self, call: &ToolCall, output: &ToolOutput) -> String {
        json!({"tool": call.name, "result": output.value}).to_string()
    }

    fn render_error(&self, call: &ToolCall, error: &ToolCallError) -> String {
        json!({
            "tool": call.name,
            "error": {"kind": error.kind(), "message": error.to_string()}
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use agentctx_application::{ExecutionContext, RunConfig};
    use agentctx_domain::{ErrorKind, ParseCategory, StatKey};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (agentctx_application::Toolchain, ExecutionContext, Arc<AtomicUsize>) {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = fixtures::toolchain(Arc::new(JsonSyntax), &invocations);
        let ctx = ExecutionContext::new("run", RunConfig::default());
        (chain, ctx, invocations)
    }

    #[tokio::test]
    async fn test_single_search_call() {
        let (chain, ctx, _) = setup();
        let result = chain
            .execute(&ctx, r#"{"tool":"search","args":{"query":"weather"}}"#)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.results[0].as_ref().unwrap(), &"Results for: weather");
        assert!(result.errors[0].is_none());
        assert_eq!(
            result.observation.text,
            r#"{"tool":"search","result":"Results for: weather"}"#
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_stop_siblings() {
        let (chain, ctx, _) = setup();
        let result = chain
            .execute(
                &ctx,
                r#"[{"tool":"a","args":{}},{"tool":"unknown","args":{}}]"#,
            )
            .await
            .unwrap();

        assert_eq!(result.results.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.results[0].as_ref().unwrap(), &"a done");
        let error = result.errors[1].as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::UnknownTool);
        assert!(result.observation.text.contains(r#""kind":"unknown_tool""#));
    }

    #[tokio::test]
    async fn test_consecutive_parse_errors_then_success() {
        let (chain, ctx, _) = setup();
        let streak = StatKey::ParseErrorStreak(ParseCategory::Toolchain);
        let sections = [
            r#"{"tool": "search", "args": {"query": "#,
            r#"{tool: search}"#,
            r#"[{"tool": "search",]"#,
            r#"{"tool": "search", "args": {"query": "weather"}}"#,
        ];

        let mut counters = Vec::new();
        for section in sections {
            let _ = chain.execute(&ctx, section).await;
            counters.push(ctx.gauge(&streak) as u64);
        }

        assert_eq!(counters, vec![1, 2, 3, 0]);
        assert_eq!(ctx.counter(&StatKey::ParseErrors(ParseCategory::Toolchain)), 3);
    }

    #[tokio::test]
    async fn test_schema_rejects_before_handler_runs() {
        let (chain, ctx, invocations) = setup();
        let result = chain
            .execute(&ctx, r#"{"tool":"count","args":{"count":"not a number"}}"#)
            .await
            .unwrap();

        let error = result.errors[0].as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::SchemaValidationFailed);
        assert!(result.results[0].is_none());
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        chain
            .execute(&ctx, r#"{"tool":"count","args":{"count":7}}"#)
            .await
            .unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_tool_name_aborts_batch() {
        let (chain, ctx, _) = setup();
        let err = chain
            .execute(&ctx, r#"[{"tool":"a"},{"args":{}}]"#)
            .await
            .unwrap_err();
        assert_eq!(err, ToolchainError::MissingToolName { index: 1 });
        assert_eq!(ctx.counter(&StatKey::ToolCalls), 0);
    }

    #[test]
    fn test_parse_shapes() {
        let tools = ToolBox::new();
        let fenced = "```json\n{\"tool\": \"a\"}\n```";
        let calls = JsonSyntax.parse_calls(fenced, &tools).unwrap();
        assert_eq!(calls[0].name, "a");
        assert!(calls[0].args.is_empty());

        assert_eq!(
            JsonSyntax.parse_calls("[]", &tools).unwrap_err(),
            ToolchainError::NoSections
        );
        assert_eq!(
            JsonSyntax.parse_calls("42", &tools).unwrap_err().kind(),
            ErrorKind::InvalidWireSyntax
        );
        assert_eq!(
            JsonSyntax
                .parse_calls(r#"{"tool":"a","args":[1]}"#, &tools)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidWireSyntax
        );
    }

    #[test]
    fn test_args_keep_written_order() {
        let calls = JsonSyntax
            .parse_calls(
                r#"{"tool":"t","args":{"zeta":1,"alpha":2,"mid":3}}"#,
                &ToolBox::new(),
            )
            .unwrap();
        let keys: Vec<&str> = calls[0].args.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }
}
