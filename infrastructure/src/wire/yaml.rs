//! YAML tool-call syntax with schema-guided scalar typing.
//!
//! Plain YAML scalars are typed by the grammar: `2026-01-20`, `007` or
//! `yes` may come out as something other than the string the model meant.
//! Parsing therefore runs in two passes:
//!
//! 1. decode into [`serde_yaml::Value`] to check the document shape and
//!    learn which tool each call names;
//! 2. decode again with a seed chain that, for every argument the tool's
//!    schema declares as `"string"`, asks the deserializer for the raw
//!    scalar text instead of the inferred value.

use super::json::call_from_value;
use super::yaml_document;
use agentctx_application::{ToolBox, WireSyntax};
use agentctx_domain::{ToolCall, ToolCallError, ToolMeta, ToolOutput, ToolchainError};
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value, json};
use std::fmt;

const SYNTAX: &str = "yaml";

/// `tool:` / `args:` mapping, or a sequence of those.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSyntax;

type Args = Map<String, Value>;

/// First pass: shape check and tool names.
fn tool_names(document: &serde_yaml::Value) -> Result<Vec<String>, ToolchainError> {
    let items: Vec<&serde_yaml::Value> = match document {
        serde_yaml::Value::Mapping(_) => vec![document],
        serde_yaml::Value::Sequence(items) => items.iter().collect(),
        _ => {
            return Err(ToolchainError::invalid(
                SYNTAX,
                "expected a call mapping or a sequence of them",
            ));
        }
    };
    if items.is_empty() {
        return Err(ToolchainError::NoSections);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_mapping() {
                return Err(ToolchainError::invalid(
                    SYNTAX,
                    format!("call #{} is not a mapping", index),
                ));
            }
            match item.get("tool").and_then(serde_yaml::Value::as_str) {
                Some(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
                _ => Err(ToolchainError::MissingToolName { index }),
            }
        })
        .collect()
}

/// Second pass: whole document, one `Args` per call.
struct BatchSeed<'a> {
    metas: &'a [Option<&'a ToolMeta>],
}

impl<'de> DeserializeSeed<'de> for BatchSeed<'_> {
    type Value = Vec<Args>;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Vec<Args>, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for BatchSeed<'_> {
    type Value = Vec<Args>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a call mapping or a sequence of call mappings")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Vec<Args>, A::Error> {
        let meta = self.metas.first().copied().flatten();
        Ok(vec![CallSeed { meta }.visit_map(map)?])
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Args>, A::Error> {
        let mut calls = Vec::with_capacity(self.metas.len());
        while let Some(args) = seq.next_element_seed(CallSeed {
            meta: self.metas.get(calls.len()).copied().flatten(),
        })? {
            calls.push(args);
        }
        Ok(calls)
    }
}

/// One call mapping. Only `args` is kept; the name came from pass one.
struct CallSeed<'a> {
    meta: Option<&'a ToolMeta>,
}

impl<'de> DeserializeSeed<'de> for CallSeed<'_> {
    type Value = Args;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Args, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for CallSeed<'_> {
    type Value = Args;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping with `tool` and `args`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Args, A::Error> {
        let mut args = Args::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == "args" {
                args = map.next_value_seed(ArgsSeed { meta: self.meta })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(args)
    }
}

struct ArgsSeed<'a> {
    meta: Option<&'a ToolMeta>,
}

impl ArgsSeed<'_> {
    fn keeps_raw(&self, key: &str) -> bool {
        self.meta.is_some_and(|meta| meta.declares_string(key))
    }
}

impl<'de> DeserializeSeed<'de> for ArgsSeed<'_> {
    type Value = Args;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Args, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ArgsSeed<'_> {
    type Value = Args;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an argument mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Args, E> {
        Ok(Args::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<Args, E> {
        Ok(Args::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Args, A::Error> {
        let mut args = Args::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = if self.keeps_raw(&key) {
                map.next_value_seed(RawScalar)?
            } else {
                map.next_value::<Value>()?
            };
            args.insert(key, value);
        }
        Ok(args)
    }
}

/// Scalar text exactly as written.
///
/// A mapping or sequence under a string-declared key is an error here.
struct RawScalar;

impl<'de> DeserializeSeed<'de> for RawScalar {
    type Value = Value;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_str(self)
    }
}

impl<'de> Visitor<'de> for RawScalar {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a scalar")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }
}

fn render(document: Value) -> String {
    // One-element sequence, so joined blocks read as a single YAML list.
    match serde_yaml::to_string(&vec![document]) {
        Ok(text) => text.trim_end().to_string(),
        Err(e) => format!("- error: {}", e),
    }
}

impl WireSyntax for YamlSyntax {
    fn name(&self) -> &'static str {
        SYNTAX
    }

    fn parse_calls(&self, raw: &str, tools: &ToolBox) -> Result<Vec<ToolCall>, ToolchainError> {
        let document_text = yaml_document(raw);
        let text = document_text.as_str();
        if text.is_empty() {
            return Err(ToolchainError::NoSections);
        }

        let document: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| ToolchainError::invalid(SYNTAX, e.to_string()))?;
        let names = tool_names(&document)?;
        let metas: Vec<Option<&ToolMeta>> = names.iter().map(|name| tools.meta(name)).collect();

        let args = BatchSeed { metas: &metas }
            .deserialize(serde_yaml::Deserializer::from_str(text))
            .map_err(|e| ToolchainError::invalid(SYNTAX, e.to_string()))?;

        names
            .into_iter()
            .zip(args)
            .enumerate()
            .map(|(index, (name, args))| {
                call_from_value(SYNTAX, index, json!({"tool": name, "args": args}))
            })
            .collect()
    }

    fn render_output(&self, call: &ToolCall, output: &ToolOutput) -> String {
        render(json!({"tool": call.name, "result": output.value}))
    }

    fn render_error(&self, call: &ToolCall, error: &ToolCallError) -> String {
        render(json!({
            "tool": call.name,
            "error": {"kind": error.kind(), "message": error.to_string()}
        }))
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

    fn tools() -> ToolBox {
        fixtures::toolbox(&Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn test_declared_strings_keep_raw_text() {
        let raw = "tool: calendar\nargs:\n  date: 2026-01-20\n  code: 007\n  days: 3\n";
        let calls = YamlSyntax.parse_calls(raw, &tools()).unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "calendar");
        assert_eq!(calls[0].args["date"], json!("2026-01-20"));
        assert_eq!(calls[0].args["code"], json!("007"));
        assert_eq!(calls[0].args["days"], json!(3));
    }

    #[test]
    fn test_undeclared_keys_use_yaml_typing() {
        let raw = "tool: unknown\nargs:\n  flag: true\n  n: 12\n";
        let calls = YamlSyntax.parse_calls(raw, &tools()).unwrap();
        assert_eq!(calls[0].args["flag"], json!(true));
        assert_eq!(calls[0].args["n"], json!(12));
    }

    #[test]
    fn test_sequence_and_block_scalars() {
        let raw = "\
- tool: search
  args:
    query: |
      first line
      second line
- tool: a
- tool: calendar
  args:
    date: >
      2026-01-20
";
        let calls = YamlSyntax.parse_calls(raw, &tools()).unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].args["query"], json!("first line\nsecond line\n"));
        assert!(calls[1].args.is_empty());
        assert_eq!(calls[2].args["date"], json!("2026-01-20\n"));
    }

    #[test]
    fn test_trailing_block_scalars_keep_final_newline() {
        let literal = "tool: search\nargs:\n  query: |\n    first line\n    second line";
        let folded = "tool: calendar\nargs:\n  date: >\n    2026-01-20";
        let fenced = format!("```yaml\n{}\n```", literal);

        for raw in [literal.to_string(), format!("{}\n\n", literal), fenced] {
            let calls = YamlSyntax.parse_calls(&raw, &tools()).unwrap();
            assert_eq!(calls[0].args["query"], json!("first line\nsecond line\n"), "{}", raw);
        }
        for raw in [folded.to_string(), format!("```\n{}\n```\n", folded)] {
            let calls = YamlSyntax.parse_calls(&raw, &tools()).unwrap();
            assert_eq!(calls[0].args["date"], json!("2026-01-20\n"), "{}", raw);
        }
    }

    #[test]
    fn test_shape_errors() {
        let tools = tools();
        assert_eq!(
            YamlSyntax.parse_calls("[]", &tools).unwrap_err(),
            ToolchainError::NoSections
        );
        assert_eq!(
            YamlSyntax
                .parse_calls("- tool: a\n- args: {}\n", &tools)
                .unwrap_err(),
            ToolchainError::MissingToolName { index: 1 }
        );
        assert_eq!(
            YamlSyntax.parse_calls("just text", &tools).unwrap_err().kind(),
            ErrorKind::InvalidWireSyntax
        );
        assert_eq!(
            YamlSyntax
                .parse_calls("tool: a\nargs: [1, 2]\n", &tools)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidWireSyntax
        );
        assert_eq!(
            YamlSyntax
                .parse_calls("tool: [unclosed\n", &tools)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidWireSyntax
        );
    }

    #[tokio::test]
    async fn test_batch_runs_through_toolchain() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = fixtures::toolchain(Arc::new(YamlSyntax), &invocations);
        let ctx = ExecutionContext::new("run", RunConfig::default());

        let raw = "```yaml\n- tool: search\n  args:\n    query: weather\n- tool: nope\n- tool: count\n  args:\n    count: 2\n```";
        let result = chain.execute(&ctx, raw).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.results[0].as_ref().unwrap(), &"Results for: weather");
        assert_eq!(
            result.errors[1].as_ref().unwrap().kind(),
            ErrorKind::UnknownTool
        );
        assert_eq!(result.results[2].as_ref().unwrap().value, json!(2));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        let observation: serde_yaml::Value =
            serde_yaml::from_str(&result.observation.text).unwrap();
        let blocks = observation.as_sequence().unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["result"].as_str(), Some("Results for: weather"));
        assert_eq!(blocks[1]["error"]["kind"].as_str(), Some("unknown_tool"));
    }

    #[tokio::test]
    async fn test_parse_errors_count_as_toolchain() {
        let chain = fixtures::toolchain(Arc::new(YamlSyntax), &Arc::new(AtomicUsize::new(0)));
        let ctx = ExecutionContext::new("run", RunConfig::default());
        let streak = StatKey::ParseErrorStreak(ParseCategory::Toolchain);

        assert!(chain.execute(&ctx, "args: {}").await.is_err());
        assert!(chain.execute(&ctx, "- 1\n- 2").await.is_err());
        assert_eq!(ctx.gauge(&streak), 2.0);

        chain.execute(&ctx, "tool: a").await.unwrap();
        assert_eq!(ctx.gauge(&streak), 0.0);
    }
}
