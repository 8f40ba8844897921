//! Port for exporting trace entries out of process memory.
//!
//! Separate from `tracing` diagnostics: a sink receives the structured
//! [`TraceEntry`] records of a run, tagged with the path of the context
//! that produced them.

use crate::context::ExecutionContext;
use agentctx_domain::TraceEntry;

pub trait TraceSink: Send + Sync {
    /// Record one entry. Failures are the sink's business, never the run's.
    fn write_entry(&self, context_path: &str, entry: &TraceEntry);

    fn flush(&self) {}
}

/// No-op sink for tests and when export is disabled.
pub struct NoTraceSink;

impl TraceSink for NoTraceSink {
    fn write_entry(&self, _context_path: &str, _entry: &TraceEntry) {}
}

/// Write `ctx`'s entries, then each child's subtree depth-first.
/// Returns the number of entries written.
pub fn export_tree(ctx: &ExecutionContext, sink: &dyn TraceSink) -> usize {
    let mut written = 0;
    for entry in ctx.entries() {
        sink.write_entry(ctx.path(), &entry);
        written += 1;
    }
    for child in ctx.children() {
        written += export_tree(&child, sink);
    }
    written
}
