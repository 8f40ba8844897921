//! Error taxonomy shared by every layer.
//!
//! Concrete error enums ([`ToolchainError`](crate::tool::ToolchainError),
//! [`ToolCallError`](crate::tool::ToolCallError), format errors in the
//! application layer) each map onto one [`ErrorKind`], so callers can branch
//! on the category without matching every variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a failure observed while running an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The model output contained none of the expected sections.
    NoSectionsFound,
    /// The tool-call block is not valid JSON/YAML.
    InvalidWireSyntax,
    /// A call object has no tool name.
    MissingToolName,
    /// A call names a tool that is not registered.
    UnknownTool,
    /// Strict mode found the same section more than once.
    AmbiguousTags,
    /// Arguments were rejected by the tool's parameter schema.
    SchemaValidationFailed,
    /// Arguments could not be converted to the tool's input type.
    ArgumentCoercionFailed,
    /// The tool handler itself returned an error.
    ToolRuntimeError,
    /// A configured limit was crossed and the run was cancelled.
    LimitExceeded,
    /// The run was cancelled by an external caller.
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoSectionsFound => "no_sections_found",
            ErrorKind::InvalidWireSyntax => "invalid_wire_syntax",
            ErrorKind::MissingToolName => "missing_tool_name",
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::AmbiguousTags => "ambiguous_tags",
            ErrorKind::SchemaValidationFailed => "schema_validation_failed",
            ErrorKind::ArgumentCoercionFailed => "argument_coercion_failed",
            ErrorKind::ToolRuntimeError => "tool_runtime_error",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Whether feeding the error back to the model can plausibly fix it.
    pub fn is_model_recoverable(&self) -> bool {
        !matches!(self, ErrorKind::LimitExceeded | ErrorKind::Cancelled)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain-level errors not tied to a single tool call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_serde() {
        let json = serde_json::to_string(&ErrorKind::SchemaValidationFailed).unwrap();
        assert_eq!(json, "\"schema_validation_failed\"");
        assert_eq!(
            ErrorKind::SchemaValidationFailed.to_string(),
            "schema_validation_failed"
        );
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(ErrorKind::UnknownTool.is_model_recoverable());
        assert!(ErrorKind::InvalidWireSyntax.is_model_recoverable());
        assert!(!ErrorKind::LimitExceeded.is_model_recoverable());
        assert!(!ErrorKind::Cancelled.is_model_recoverable());
    }
}
