//! Tool hook port — before/after observers around each dispatched call.
//!
//! Hooks run synchronously, in registration order, on the task that runs
//! the call. A before-hook may rewrite the canonical arguments or answer
//! the call itself; an after-hook only observes.
//!
//! ```text
//! coerce ─▶ before hooks ─▶ dispatch ─▶ after hooks ─▶ trace
//!              │  (args may change)
//!              └─ response set? ──────▶ skip dispatch
//! ```

use crate::context::ExecutionContext;
use agentctx_domain::{ErrorKind, ToolError, ToolOutput};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Mutable view of a call about to be dispatched.
#[derive(Debug, Clone)]
pub struct BeforeToolCall {
    pub tool: String,
    /// Canonical (already coerced) arguments. Changes are dispatched.
    pub args: Value,
    pub iteration: u32,
    /// Set to answer the call without running the handler.
    pub response: Option<Result<ToolOutput, ToolError>>,
}

impl BeforeToolCall {
    pub fn new(tool: impl Into<String>, args: Value, iteration: u32) -> Self {
        Self {
            tool: tool.into(),
            args,
            iteration,
            response: None,
        }
    }

    pub fn short_circuit(&mut self, response: Result<ToolOutput, ToolError>) {
        self.response = Some(response);
    }

    pub fn is_short_circuited(&self) -> bool {
        self.response.is_some()
    }
}

/// Read-only view of a finished call.
#[derive(Debug, Clone)]
pub struct AfterToolCall {
    pub tool: String,
    pub args: Value,
    pub iteration: u32,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub duration: Duration,
    /// Whether a before-hook answered the call.
    pub short_circuited: bool,
}

impl AfterToolCall {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Observer/mutator around tool calls. Both methods default to no-ops.
pub trait ToolHook: Send + Sync {
    fn before_tool_call(&self, _ctx: &ExecutionContext, _event: &mut BeforeToolCall) {}

    fn after_tool_call(&self, _ctx: &ExecutionContext, _event: &AfterToolCall) {}
}

/// Ordered fan-out over registered hooks.
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: Vec<Arc<dyn ToolHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: Arc<dyn ToolHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn register(&mut self, hook: Arc<dyn ToolHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn fire_before_tool_call(&self, ctx: &ExecutionContext, event: &mut BeforeToolCall) {
        for hook in &self.hooks {
            hook.before_tool_call(ctx, event);
            if event.is_short_circuited() {
                break;
            }
        }
    }

    pub fn fire_after_tool_call(&self, ctx: &ExecutionContext, event: &AfterToolCall) {
        for hook in &self.hooks {
            hook.after_tool_call(ctx, event);
        }
    }
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ToolHook for Recorder {
        fn before_tool_call(&self, _ctx: &ExecutionContext, event: &mut BeforeToolCall) {
            self.seen.lock().unwrap().push(format!("before:{}", self.label));
            event.args["touched_by"] = json!(self.label);
        }

        fn after_tool_call(&self, _ctx: &ExecutionContext, _event: &AfterToolCall) {
            self.seen.lock().unwrap().push(format!("after:{}", self.label));
        }
    }

    struct Answer;

    impl ToolHook for Answer {
        fn before_tool_call(&self, _ctx: &ExecutionContext, event: &mut BeforeToolCall) {
            event.short_circuit(Ok(ToolOutput::new(json!("cached"))));
        }
    }

    #[test]
    fn test_hooks_fire_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooks = HookSet::new()
            .with_hook(Arc::new(Recorder { label: "a", seen: seen.clone() }))
            .with_hook(Arc::new(Recorder { label: "b", seen: seen.clone() }));
        let ctx = ExecutionContext::new("run", RunConfig::default());

        let mut before = BeforeToolCall::new("t", json!({}), 1);
        hooks.fire_before_tool_call(&ctx, &mut before);
        assert_eq!(before.args["touched_by"], "b");

        let after = AfterToolCall {
            tool: "t".into(),
            args: before.args.clone(),
            iteration: 1,
            output: None,
            error: None,
            error_kind: None,
            duration: Duration::ZERO,
            short_circuited: false,
        };
        hooks.fire_after_tool_call(&ctx, &after);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["before:a", "before:b", "after:a", "after:b"]
        );
    }

    #[test]
    fn test_short_circuit_stops_later_before_hooks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooks = HookSet::new()
            .with_hook(Arc::new(Answer))
            .with_hook(Arc::new(Recorder { label: "late", seen: seen.clone() }));
        let ctx = ExecutionContext::new("run", RunConfig::default());

        let mut before = BeforeToolCall::new("t", json!({}), 1);
        hooks.fire_before_tool_call(&ctx, &mut before);
        assert!(before.is_short_circuited());
        assert!(seen.lock().unwrap().is_empty());
    }
}
