//! Append-only trace log.

use super::event::{TraceEntry, TraceRecord};
use crate::stats::StatStore;
use chrono::Utc;

/// Ordered, append-only sequence of [`TraceEntry`] values.
///
/// Appending stamps the record and applies the event's stat effect to the
/// given store in the same step, so the log and the stats can never
/// disagree.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: Vec<TraceEntry>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `record` with the defaults for any missing field, aggregate it
    /// into `stats`, and append it.
    pub fn append(
        &mut self,
        record: TraceRecord,
        iteration: u32,
        depth: u32,
        stats: &mut StatStore,
    ) -> &TraceEntry {
        let entry = TraceEntry {
            timestamp: record.timestamp.unwrap_or_else(Utc::now),
            iteration: record.iteration.unwrap_or(iteration),
            depth: record.depth.unwrap_or(depth),
            event: record.event,
        };
        entry.event.aggregate(entry.iteration, stats);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
