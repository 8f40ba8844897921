//! Domain layer for agentctx
//!
//! Pure data and rules for an agent run. No I/O, no locking, no async.
//!
//! # Core Concepts
//!
//! | Module | Concept |
//! |--------|---------|
//! | [`stats`] | Keyed counters (monotonic) and gauges (settable) |
//! | [`limit`] | Ceilings on stats, exact key or key prefix |
//! | [`trace`] | Tagged events, stamping, per-variant aggregation |
//! | [`run`] | Loop actions, termination reasons, run outcome |
//! | [`stream`] | Partial-output chunks and subscriber filters |
//! | [`tool`] | Tool calls, metadata, slot errors, input coercion |
//!
//! The application layer wraps these in a concurrency-safe
//! `ExecutionContext` tree and the tool invocation pipeline.

pub mod core;
pub mod limit;
pub mod run;
pub mod stats;
pub mod stream;
pub mod tool;
pub mod trace;

// Re-export commonly used types
pub use core::error::{DomainError, ErrorKind};
pub use core::string::{preview_value, truncate};
pub use limit::{ExceededLimit, Limit, MatchType, first_violation};
pub use run::{LoopAction, RunOutcome, TerminationReason};
pub use stats::{ParseCategory, StatKey, StatStore};
pub use stream::{ChunkFilter, StreamChunk};
pub use tool::{
    MediaPart, Observation, ToolCall, ToolCallError, ToolChainResult, ToolError, ToolMeta,
    ToolOutput, ToolchainError,
};
pub use trace::{TraceEntry, TraceEvent, TraceLog, TraceRecord};
