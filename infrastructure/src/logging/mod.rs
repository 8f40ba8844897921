//! Logging infrastructure — trace export and tool-call diagnostics.
//!
//! - [`JsonlTraceWriter`] implements the
//!   [`TraceSink`](agentctx_application::TraceSink) port, one JSON line per
//!   trace entry.
//! - [`TracingHooks`] implements [`ToolHook`](agentctx_application::ToolHook)
//!   and reports each call through `tracing`.

mod jsonl_trace;
mod tracing_hooks;

pub use jsonl_trace::JsonlTraceWriter;
pub use tracing_hooks::TracingHooks;
