//! Application layer for agentctx
//!
//! The execution context engine, the tool invocation pipeline, and the
//! ports their adapters implement. Depends only on the domain layer.

pub mod config;
pub mod context;
pub mod ports;
pub mod toolchain;

// Re-export commonly used types
pub use config::{RunConfig, StreamBufferPolicy, SyntaxKind};
pub use context::{CancelCause, ExecutionContext, StreamHub, Subscription};
pub use ports::{
    hooks::{AfterToolCall, BeforeToolCall, HookSet, ToolHook},
    schema::{SchemaCompiler, SchemaError, SchemaValidator},
    text_format::{FormatError, Sections, TextFormat},
    tool::{DynTool, InvokeError, Tool},
    trace_sink::{NoTraceSink, TraceSink, export_tree},
    wire_syntax::WireSyntax,
};
pub use toolchain::{RegistryError, ToolBox, Toolchain};
