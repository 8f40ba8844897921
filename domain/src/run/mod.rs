//! Run lifecycle value objects: loop actions, termination, final outcome.

use crate::limit::ExceededLimit;
use crate::stats::StatStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the agent loop decided at the end of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopAction {
    Continue,
    Stop,
    Error,
}

impl LoopAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopAction::Continue => "continue",
            LoopAction::Stop => "stop",
            LoopAction::Error => "error",
        }
    }
}

impl std::fmt::Display for LoopAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a run (or sub-run) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model signalled it was done.
    Completed,
    /// The loop hit its own stop condition (e.g. max iterations).
    Stopped,
    /// A configured limit tripped.
    LimitExceeded,
    /// An external caller cancelled the run.
    Cancelled,
    /// The run failed with an error.
    Failed,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Completed => "completed",
            TerminationReason::Stopped => "stopped",
            TerminationReason::LimitExceeded => "limit_exceeded",
            TerminationReason::Cancelled => "cancelled",
            TerminationReason::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminationReason::Completed)
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consolidated result published once when a context terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub name: String,
    pub depth: u32,
    pub reason: TerminationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceeded_limit: Option<ExceededLimit>,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub stats: StatStore,
}

impl RunOutcome {
    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_serde() {
        let json = serde_json::to_string(&TerminationReason::LimitExceeded).unwrap();
        assert_eq!(json, "\"limit_exceeded\"");
        assert!(TerminationReason::Completed.is_success());
        assert!(!TerminationReason::Cancelled.is_success());
    }

    #[test]
    fn test_outcome_duration() {
        let started_at = Utc::now();
        let outcome = RunOutcome {
            name: "root".to_string(),
            depth: 0,
            reason: TerminationReason::Completed,
            result: None,
            error: None,
            exceeded_limit: None,
            iterations: 2,
            started_at,
            ended_at: started_at + chrono::Duration::milliseconds(1500),
            stats: StatStore::new(),
        };
        assert_eq!(outcome.duration_ms(), 1500);
    }
}
