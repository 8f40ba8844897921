//! Tool invocation pipeline.
//!
//! Turns one extracted tool-call section into executed results:
//!
//! | Stage | Failure | Scope |
//! |-------|---------|-------|
//! | parse | [`ToolchainError`] | whole batch; traced as a `toolchain` parse error |
//! | lookup | `UnknownTool` | slot |
//! | validate (raw args) | `SchemaValidation` | slot |
//! | coerce | `Coercion` | slot |
//! | before hooks, dispatch, after hooks | `Runtime` | slot |
//! | trace | — | every slot, any outcome |
//! | format | — | observation text + media |
//!
//! Slots run concurrently and land in call order; one failing slot never
//! stops its siblings.
//!
//! # Streak ownership
//!
//! The pipeline is the only writer that resets tool-error streaks: after
//! each successful call it calls
//! [`ExecutionContext::reset_tool_error_streak`]. A successful parse ends
//! the `toolchain` parse-error streak.

use super::registry::ToolBox;
use crate::context::ExecutionContext;
use crate::ports::hooks::{AfterToolCall, BeforeToolCall, HookSet, ToolHook};
use crate::ports::tool::InvokeError;
use crate::ports::wire_syntax::WireSyntax;
use agentctx_domain::core::string::truncate;
use agentctx_domain::{
    ParseCategory, ToolCall, ToolCallError, ToolChainResult, ToolOutput, ToolchainError,
    TraceEvent,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Wire-syntax-specific driver of the pipeline.
#[derive(Clone)]
pub struct Toolchain {
    syntax: Arc<dyn WireSyntax>,
    tools: Arc<ToolBox>,
    hooks: HookSet,
}

/// What one slot produced before tracing.
struct SlotRun {
    args: Value,
    outcome: Result<ToolOutput, ToolCallError>,
    duration: Duration,
}

impl Toolchain {
    pub fn new(syntax: Arc<dyn WireSyntax>, tools: Arc<ToolBox>) -> Self {
        Self {
            syntax,
            tools,
            hooks: HookSet::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ToolHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn syntax(&self) -> &dyn WireSyntax {
        self.syntax.as_ref()
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// Parse a section into calls and record the outcome on `ctx`.
    pub fn parse(&self, ctx: &ExecutionContext, raw: &str) -> Result<Vec<ToolCall>, ToolchainError> {
        let parsed = if raw.trim().is_empty() {
            Err(ToolchainError::NoSections)
        } else {
            self.syntax.parse_calls(raw, &self.tools)
        };

        match parsed {
            Ok(calls) => {
                ctx.record_parse_success(ParseCategory::Toolchain);
                debug!(syntax = self.syntax.name(), calls = calls.len(), "tool calls parsed");
                Ok(calls)
            }
            Err(e) => {
                ctx.record_parse_error(ParseCategory::Toolchain, e.to_string());
                Err(e)
            }
        }
    }

    /// Parse `raw` and run every call in it.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        raw: &str,
    ) -> Result<ToolChainResult, ToolchainError> {
        let calls = self.parse(ctx, raw)?;
        Ok(self.execute_calls(ctx, calls).await)
    }

    /// Run already-parsed calls. Always yields one slot per call.
    pub async fn execute_calls(&self, ctx: &ExecutionContext, calls: Vec<ToolCall>) -> ToolChainResult {
        let runs = futures::future::join_all(calls.iter().map(|call| self.run_slot(ctx, call))).await;

        let mut results = Vec::with_capacity(calls.len());
        let mut errors = Vec::with_capacity(calls.len());
        for outcome in runs {
            match outcome {
                Ok(output) => {
                    results.push(Some(output));
                    errors.push(None);
                }
                Err(error) => {
                    results.push(None);
                    errors.push(Some(error));
                }
            }
        }

        let mut result = ToolChainResult {
            calls,
            results,
            errors,
            observation: Default::default(),
        };
        result.observation = self.syntax.format_observation(&result);
        result
    }

    async fn run_slot(
        &self,
        ctx: &ExecutionContext,
        call: &ToolCall,
    ) -> Result<ToolOutput, ToolCallError> {
        let run = self.dispatch(ctx, call).await;

        let (output, error, error_kind) = match &run.outcome {
            Ok(output) => (Some(output.value.clone()), None, None),
            Err(e) => (None, Some(e.to_string()), Some(e.kind())),
        };
        ctx.trace(TraceEvent::ToolCall {
            tool: call.name.clone(),
            input: run.args,
            output,
            duration_ms: run.duration.as_millis() as u64,
            error,
            error_kind,
        });

        match &run.outcome {
            Ok(_) => ctx.reset_tool_error_streak(&call.name),
            Err(e) => debug!(tool = %call.name, kind = %e.kind(), error = %e, "tool call failed"),
        }
        run.outcome
    }

    async fn dispatch(&self, ctx: &ExecutionContext, call: &ToolCall) -> SlotRun {
        let raw_args = call.args_value();
        let fail = |args: Value, error: ToolCallError| SlotRun {
            args,
            outcome: Err(error),
            duration: Duration::ZERO,
        };

        if ctx.is_cancelled() {
            let cause = ctx
                .cancel_cause()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "cancelled".to_string());
            return fail(
                raw_args,
                ToolCallError::Cancelled {
                    tool: call.name.clone(),
                    cause,
                },
            );
        }

        let Some(registered) = self.tools.get(&call.name) else {
            return fail(
                raw_args,
                ToolCallError::UnknownTool {
                    name: call.name.clone(),
                    available: self.tools.names(),
                },
            );
        };

        if let Some(validator) = registered.validator() {
            if let Err(e) = validator.validate(&raw_args) {
                return fail(
                    raw_args,
                    ToolCallError::SchemaValidation {
                        tool: call.name.clone(),
                        message: e.to_string(),
                    },
                );
            }
        }

        let handler = registered.handler();
        let coerced = match handler.coerce(raw_args.clone()) {
            Ok(coerced) => coerced,
            Err(message) => {
                return fail(
                    raw_args,
                    ToolCallError::Coercion {
                        tool: call.name.clone(),
                        message,
                    },
                );
            }
        };

        let iteration = ctx.iteration();
        let mut before = BeforeToolCall::new(call.name.clone(), coerced, iteration);
        self.hooks.fire_before_tool_call(ctx, &mut before);
        let BeforeToolCall { args, response, .. } = before;
        let short_circuited = response.is_some();

        trace!(tool = %call.name, args = %truncate(&args.to_string(), 200), "dispatching tool call");
        let started = Instant::now();
        let outcome = match response {
            Some(answer) => answer.map_err(|error| ToolCallError::Runtime {
                tool: call.name.clone(),
                error,
            }),
            None => handler.invoke(ctx, args.clone()).await.map_err(|e| match e {
                InvokeError::Coercion(message) => ToolCallError::Coercion {
                    tool: call.name.clone(),
                    message,
                },
                InvokeError::Runtime(error) => ToolCallError::Runtime {
                    tool: call.name.clone(),
                    error,
                },
            }),
        };
        let duration = started.elapsed();

        let after = AfterToolCall {
            tool: call.name.clone(),
            args: args.clone(),
            iteration,
            output: outcome.as_ref().ok().map(|o| o.value.clone()),
            error: outcome.as_ref().err().map(ToString::to_string),
            error_kind: outcome.as_ref().err().map(ToolCallError::kind),
            duration,
            short_circuited,
        };
        self.hooks.fire_after_tool_call(ctx, &after);

        SlotRun {
            args,
            outcome,
            duration,
        }
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain")
            .field("syntax", &self.syntax.name())
            .field("tools", &self.tools)
            .field("hooks", &self.hooks)
            .finish()
    }
}
