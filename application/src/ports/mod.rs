//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod hooks;
pub mod schema;
pub mod text_format;
pub mod tool;
pub mod trace_sink;
pub mod wire_syntax;
