//! Tool domain module
//!
//! Pure definitions shared by the invocation pipeline: the parsed
//! [`ToolCall`], the per-registration [`ToolMeta`], slot and batch errors,
//! and the lenient input [`coerce`] rules.
//!
//! ```text
//! raw text ──parse──▶ ToolCall ──lookup/validate/coerce──▶ handler
//!                                                            │
//!            Observation ◀──format── ToolChainResult ◀───────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolCall`] — name plus ordered argument map
//! - [`ToolMeta`] — name, description, raw schema, input type name
//! - [`ToolCallError`] — failure confined to one slot
//! - [`ToolchainError`] — failure that aborts the batch
//! - [`ToolChainResult`] — 1:1, order-preserving result/error slots

pub mod coerce;
pub mod entities;
pub mod value_objects;

pub use coerce::{CoercionError, Timestamp, parse_duration, parse_timestamp};
pub use entities::{ToolCall, ToolMeta};
pub use value_objects::{
    MediaPart, Observation, ToolCallError, ToolChainResult, ToolError, ToolOutput, ToolchainError,
};
