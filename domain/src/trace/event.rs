//! Trace event variants and their stat aggregation rules.

use crate::core::error::ErrorKind;
use crate::run::{LoopAction, TerminationReason};
use crate::stats::{ParseCategory, StatKey, StatStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    IterationStart,
    IterationEnd {
        action: LoopAction,
        duration_ms: u64,
    },
    ModelCall {
        model: String,
        input_tokens: u64,
        output_tokens: u64,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ToolCall {
        tool: String,
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
    },
    ParseError {
        category: ParseCategory,
        message: String,
    },
    ChildSpawn {
        child: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    ChildComplete {
        child: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<TerminationReason>,
        duration_ms: u64,
    },
    Custom {
        name: String,
        #[serde(default)]
        data: Value,
    },
}

impl TraceEvent {
    /// Short variant name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEvent::IterationStart => "iteration_start",
            TraceEvent::IterationEnd { .. } => "iteration_end",
            TraceEvent::ModelCall { .. } => "model_call",
            TraceEvent::ToolCall { .. } => "tool_call",
            TraceEvent::ParseError { .. } => "parse_error",
            TraceEvent::ChildSpawn { .. } => "child_spawn",
            TraceEvent::ChildComplete { .. } => "child_complete",
            TraceEvent::Custom { .. } => "custom",
        }
    }

    /// Apply this event's stat effect.
    ///
    /// - `ModelCall`: token counters, total and per model.
    /// - `ToolCall`: call counters; on error also error counters and the
    ///   consecutive streak gauges. Success leaves the streak alone; the
    ///   toolchain resets it.
    /// - `ParseError`: total, per-iteration and consecutive, per category.
    /// - `IterationStart`: the iteration counter.
    pub fn aggregate(&self, iteration: u32, stats: &mut StatStore) {
        match self {
            TraceEvent::IterationStart => {
                stats.increment(&StatKey::Iterations, 1);
            }
            TraceEvent::ModelCall {
                model,
                input_tokens,
                output_tokens,
                error,
                ..
            } => {
                stats.increment(&StatKey::ModelCalls, 1);
                stats.increment(&StatKey::InputTokens, *input_tokens);
                stats.increment(&StatKey::OutputTokens, *output_tokens);
                stats.increment(&StatKey::ModelInputTokens(model.clone()), *input_tokens);
                stats.increment(&StatKey::ModelOutputTokens(model.clone()), *output_tokens);
                if error.is_some() {
                    stats.increment(&StatKey::ModelErrors, 1);
                }
            }
            TraceEvent::ToolCall { tool, error, .. } => {
                stats.increment(&StatKey::ToolCalls, 1);
                stats.increment(&StatKey::ToolCallsFor(tool.clone()), 1);
                if error.is_some() {
                    stats.increment(&StatKey::ToolErrors, 1);
                    stats.increment(&StatKey::ToolErrorsFor(tool.clone()), 1);
                    stats.add_gauge(&StatKey::ToolErrorStreak, 1.0);
                    stats.add_gauge(&StatKey::ToolErrorStreakFor(tool.clone()), 1.0);
                }
            }
            TraceEvent::ParseError { category, .. } => {
                stats.increment(&StatKey::ParseErrors(*category), 1);
                stats.increment(&StatKey::ParseErrorsAt(*category, iteration), 1);
                stats.add_gauge(&StatKey::ParseErrorStreak(*category), 1.0);
            }
            TraceEvent::ChildSpawn { .. } => {
                stats.increment(&StatKey::ChildrenSpawned, 1);
            }
            TraceEvent::ChildComplete { .. } => {
                stats.increment(&StatKey::ChildrenCompleted, 1);
            }
            TraceEvent::IterationEnd { .. } | TraceEvent::Custom { .. } => {}
        }
    }
}

/// An event about to be traced. Stamps left as `None` are filled in from
/// the owning context when the event is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub event: TraceEvent,
    pub timestamp: Option<DateTime<Utc>>,
    pub iteration: Option<u32>,
    pub depth: Option<u32>,
}

impl TraceRecord {
    pub fn new(event: TraceEvent) -> Self {
        Self {
            event,
            timestamp: None,
            iteration: None,
            depth: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn at_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }
}

impl From<TraceEvent> for TraceRecord {
    fn from(event: TraceEvent) -> Self {
        Self::new(event)
    }
}

/// An appended, fully stamped event. Immutable once in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    pub iteration: u32,
    pub depth: u32,
    #[serde(flatten)]
    pub event: TraceEvent,
}
