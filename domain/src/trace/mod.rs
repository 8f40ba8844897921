//! Run trace: tagged events, stamping, and the append-only log.

pub mod event;
pub mod log;

pub use event::{TraceEntry, TraceEvent, TraceRecord};
pub use log::TraceLog;
