//! Tool hook that reports every call through `tracing`.

use agentctx_application::{AfterToolCall, BeforeToolCall, ExecutionContext, ToolHook};
use agentctx_domain::preview_value;
use tracing::{debug, info, warn};

const ARGS_PREVIEW: usize = 200;

/// Logs `before` at debug and `after` at info, or warn on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl ToolHook for TracingHooks {
    fn before_tool_call(&self, ctx: &ExecutionContext, event: &mut BeforeToolCall) {
        debug!(
            context = %ctx.path(),
            tool = %event.tool,
            iteration = event.iteration,
            args = %preview_value(&event.args, ARGS_PREVIEW),
            "tool call starting"
        );
    }

    fn after_tool_call(&self, ctx: &ExecutionContext, event: &AfterToolCall) {
        let duration_ms = event.duration.as_millis() as u64;
        match (&event.error, event.error_kind) {
            (Some(error), kind) => warn!(
                context = %ctx.path(),
                tool = %event.tool,
                iteration = event.iteration,
                duration_ms,
                kind = kind.map(|k| k.as_str()).unwrap_or("unknown"),
                %error,
                "tool call failed"
            ),
            (None, _) => info!(
                context = %ctx.path(),
                tool = %event.tool,
                iteration = event.iteration,
                duration_ms,
                short_circuited = event.short_circuited,
                "tool call finished"
            ),
        }
    }
}
