//! Run configuration — limits, stream buffering, text parsing mode.
//!
//! [`RunConfig`] is shared (behind an `Arc`) by every context in one run
//! tree. Only the root evaluates [`RunConfig::limits`].

use agentctx_domain::Limit;
use serde::{Deserialize, Serialize};

/// How each streaming subscriber buffers chunks.
///
/// Emitters never wait in either mode.
///
/// | Policy | Full subscriber |
/// |--------|-----------------|
/// | `Unbounded` (default) | cannot happen; memory grows until drained |
/// | `Bounded` | chunk dropped, `stream.dropped` counter bumped |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StreamBufferPolicy {
    #[default]
    Unbounded,
    Bounded { capacity: usize },
}

/// Wire syntax used for tool-call sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxKind {
    #[default]
    Json,
    Yaml,
}

impl SyntaxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyntaxKind::Json => "json",
            SyntaxKind::Yaml => "yaml",
        }
    }
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyntaxKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SyntaxKind::Json),
            "yaml" | "yml" => Ok(SyntaxKind::Yaml),
            other => Err(format!("unknown wire syntax '{}'", other)),
        }
    }
}

/// Static parameters for one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ceilings checked at the root after every trace.
    pub limits: Vec<Limit>,
    pub stream_buffer: StreamBufferPolicy,
    /// Reject duplicate section tags instead of collecting them.
    pub strict_tags: bool,
    pub syntax: SyntaxKind,
}

impl RunConfig {
    // ==================== Builder Methods ====================

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limits.push(limit);
        self
    }

    pub fn with_limits(mut self, limits: impl IntoIterator<Item = Limit>) -> Self {
        self.limits.extend(limits);
        self
    }

    pub fn with_stream_buffer(mut self, policy: StreamBufferPolicy) -> Self {
        self.stream_buffer = policy;
        self
    }

    pub fn with_strict_tags(mut self, strict: bool) -> Self {
        self.strict_tags = strict;
        self
    }

    pub fn with_syntax(mut self, syntax: SyntaxKind) -> Self {
        self.syntax = syntax;
        self
    }
}
