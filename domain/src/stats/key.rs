//! Structured stat keys.
//!
//! Keys are flat, dot-namespaced strings on the wire (that is what limits
//! match against), but code builds them through [`StatKey`] so the
//! namespacing stays consistent.
//!
//! | Key | Kind | Rendered |
//! |-----|------|----------|
//! | `Iterations` | counter | `iterations` |
//! | `ModelCalls` | counter | `model.calls.total` |
//! | `InputTokens` / `ModelInputTokens(m)` | counter | `tokens.input.total` / `tokens.input.by.<m>` |
//! | `ToolCalls` / `ToolCallsFor(t)` | counter | `tool.calls.total` / `tool.calls.by.<t>` |
//! | `ToolErrors` / `ToolErrorsFor(t)` | counter | `tool.errors.total` / `tool.errors.by.<t>` |
//! | `ToolErrorStreak` / `ToolErrorStreakFor(t)` | gauge | `tool.errors.consecutive[.by.<t>]` |
//! | `ParseErrors(c)` | counter | `parse.<c>.total` |
//! | `ParseErrorsAt(c, n)` | counter | `parse.<c>.at.<n>` |
//! | `ParseErrorStreak(c)` | gauge | `parse.<c>.consecutive` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category of a parse failure, each with its own counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseCategory {
    /// The model output did not match the text format (sections).
    Format,
    /// A tool-call section could not be parsed as JSON/YAML.
    Toolchain,
    /// A required section was missing or unusable.
    Section,
    /// The termination section could not be interpreted.
    Termination,
}

impl ParseCategory {
    pub const ALL: [ParseCategory; 4] = [
        ParseCategory::Format,
        ParseCategory::Toolchain,
        ParseCategory::Section,
        ParseCategory::Termination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParseCategory::Format => "format",
            ParseCategory::Toolchain => "toolchain",
            ParseCategory::Section => "section",
            ParseCategory::Termination => "termination",
        }
    }
}

impl std::fmt::Display for ParseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "format" => Ok(ParseCategory::Format),
            "toolchain" => Ok(ParseCategory::Toolchain),
            "section" => Ok(ParseCategory::Section),
            "termination" => Ok(ParseCategory::Termination),
            other => Err(format!("unknown parse category: {}", other)),
        }
    }
}

/// A stat store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatKey {
    Iterations,
    ModelCalls,
    ModelErrors,
    InputTokens,
    OutputTokens,
    ModelInputTokens(String),
    ModelOutputTokens(String),
    ToolCalls,
    ToolCallsFor(String),
    ToolErrors,
    ToolErrorsFor(String),
    ToolErrorStreak,
    ToolErrorStreakFor(String),
    ParseErrors(ParseCategory),
    ParseErrorsAt(ParseCategory, u32),
    ParseErrorStreak(ParseCategory),
    ChildrenSpawned,
    ChildrenCompleted,
    StreamDropped,
    /// Any caller-defined key, used verbatim.
    Custom(String),
}

impl StatKey {
    pub fn custom(key: impl Into<String>) -> Self {
        StatKey::Custom(key.into())
    }

    /// Render the flat key string.
    pub fn render(&self) -> String {
        match self {
            StatKey::Iterations => "iterations".to_string(),
            StatKey::ModelCalls => "model.calls.total".to_string(),
            StatKey::ModelErrors => "model.errors.total".to_string(),
            StatKey::InputTokens => "tokens.input.total".to_string(),
            StatKey::OutputTokens => "tokens.output.total".to_string(),
            StatKey::ModelInputTokens(model) => format!("tokens.input.by.{}", model),
            StatKey::ModelOutputTokens(model) => format!("tokens.output.by.{}", model),
            StatKey::ToolCalls => "tool.calls.total".to_string(),
            StatKey::ToolCallsFor(tool) => format!("tool.calls.by.{}", tool),
            StatKey::ToolErrors => "tool.errors.total".to_string(),
            StatKey::ToolErrorsFor(tool) => format!("tool.errors.by.{}", tool),
            StatKey::ToolErrorStreak => "tool.errors.consecutive".to_string(),
            StatKey::ToolErrorStreakFor(tool) => format!("tool.errors.consecutive.by.{}", tool),
            StatKey::ParseErrors(category) => format!("parse.{}.total", category),
            StatKey::ParseErrorsAt(category, iteration) => {
                format!("parse.{}.at.{}", category, iteration)
            }
            StatKey::ParseErrorStreak(category) => format!("parse.{}.consecutive", category),
            StatKey::ChildrenSpawned => "children.spawned".to_string(),
            StatKey::ChildrenCompleted => "children.completed".to_string(),
            StatKey::StreamDropped => "stream.dropped".to_string(),
            StatKey::Custom(key) => key.clone(),
        }
    }

    /// Streak keys are gauges (they reset); everything else is a counter.
    pub fn is_gauge(&self) -> bool {
        matches!(
            self,
            StatKey::ToolErrorStreak | StatKey::ToolErrorStreakFor(_) | StatKey::ParseErrorStreak(_)
        )
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for StatKey {
    fn from(s: &str) -> Self {
        StatKey::Custom(s.to_string())
    }
}
