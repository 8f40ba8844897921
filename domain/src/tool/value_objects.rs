//! Tool domain value objects — outputs, errors, and batch results.
//!
//! Errors come in two tiers:
//!
//! | Type | Scope | Effect |
//! |------|-------|--------|
//! | [`ToolchainError`] | whole batch | nothing is dispatched |
//! | [`ToolCallError`] | one slot | siblings still run |
//!
//! A [`ToolChainResult`] always has one result slot and one error slot per
//! parsed call, in call order.

use super::entities::ToolCall;
use crate::core::error::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error returned by a tool handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

impl From<String> for ToolError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ToolError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Side-channel media attached to a tool result (images, files).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPart {
    pub mime_type: String,
    /// Base64 for binary payloads, plain text otherwise.
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MediaPart {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Successful output of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaPart>,
}

impl ToolOutput {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            media: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: Vec<MediaPart>) -> Self {
        self.media = media;
        self
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

impl PartialEq<&str> for ToolOutput {
    fn eq(&self, other: &&str) -> bool {
        self.value.as_str() == Some(*other)
    }
}

/// Failure confined to a single call slot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolCallError {
    #[error("unknown tool '{name}' (available: {})", available.join(", "))]
    UnknownTool { name: String, available: Vec<String> },

    #[error("arguments for '{tool}' failed schema validation: {message}")]
    SchemaValidation { tool: String, message: String },

    #[error("arguments for '{tool}' could not be converted: {message}")]
    Coercion { tool: String, message: String },

    #[error("tool '{tool}' failed: {error}")]
    Runtime { tool: String, error: ToolError },

    #[error("tool '{tool}' was not run: {cause}")]
    Cancelled { tool: String, cause: String },
}

impl ToolCallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolCallError::UnknownTool { .. } => ErrorKind::UnknownTool,
            ToolCallError::SchemaValidation { .. } => ErrorKind::SchemaValidationFailed,
            ToolCallError::Coercion { .. } => ErrorKind::ArgumentCoercionFailed,
            ToolCallError::Runtime { .. } => ErrorKind::ToolRuntimeError,
            ToolCallError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            ToolCallError::UnknownTool { name, .. } => name,
            ToolCallError::SchemaValidation { tool, .. }
            | ToolCallError::Coercion { tool, .. }
            | ToolCallError::Runtime { tool, .. }
            | ToolCallError::Cancelled { tool, .. } => tool,
        }
    }
}

/// Failure that aborts a whole tool-call batch before dispatch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolchainError {
    #[error("no tool-call section found")]
    NoSections,

    #[error("invalid {syntax} tool call: {message}")]
    InvalidSyntax {
        syntax: &'static str,
        message: String,
    },

    #[error("tool call #{index} has no tool name")]
    MissingToolName { index: usize },
}

impl ToolchainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolchainError::NoSections => ErrorKind::NoSectionsFound,
            ToolchainError::InvalidSyntax { .. } => ErrorKind::InvalidWireSyntax,
            ToolchainError::MissingToolName { .. } => ErrorKind::MissingToolName,
        }
    }

    pub fn invalid(syntax: &'static str, message: impl Into<String>) -> Self {
        ToolchainError::InvalidSyntax {
            syntax,
            message: message.into(),
        }
    }
}

/// Text fed back to the model after a batch, plus attached media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaPart>,
}

/// Outcome of one tool-call batch.
///
/// `results[i]` and `errors[i]` describe `calls[i]`; exactly one of the two
/// is `Some`.
#[derive(Debug, Clone, Default)]
pub struct ToolChainResult {
    pub calls: Vec<ToolCall>,
    pub results: Vec<Option<ToolOutput>>,
    pub errors: Vec<Option<ToolCallError>>,
    pub observation: Observation,
}

impl ToolChainResult {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Option::is_some)
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }

    /// Iterate `(call, outcome)` pairs in call order.
    pub fn slots(&self) -> impl Iterator<Item = (&ToolCall, Result<&ToolOutput, &ToolCallError>)> {
        self.calls
            .iter()
            .zip(self.results.iter().zip(self.errors.iter()))
            .filter_map(|(call, slot)| match slot {
                (Some(output), _) => Some((call, Ok(output))),
                (None, Some(error)) => Some((call, Err(error))),
                (None, None) => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_error_kinds() {
        let unknown = ToolCallError::UnknownTool {
            name: "nope".into(),
            available: vec!["a".into(), "b".into()],
        };
        assert_eq!(unknown.kind(), ErrorKind::UnknownTool);
        assert_eq!(unknown.tool(), "nope");
        assert!(unknown.to_string().contains("available: a, b"));

        let runtime = ToolCallError::Runtime {
            tool: "search".into(),
            error: ToolError::new("timeout").with_details("after 30s"),
        };
        assert_eq!(runtime.kind(), ErrorKind::ToolRuntimeError);
        assert_eq!(runtime.to_string(), "tool 'search' failed: timeout (after 30s)");
    }

    #[test]
    fn test_toolchain_error_kinds() {
        assert_eq!(ToolchainError::NoSections.kind(), ErrorKind::NoSectionsFound);
        assert_eq!(
            ToolchainError::invalid("json", "eof").kind(),
            ErrorKind::InvalidWireSyntax
        );
        assert_eq!(
            ToolchainError::MissingToolName { index: 1 }.kind(),
            ErrorKind::MissingToolName
        );
    }

    #[test]
    fn test_output_compares_to_str() {
        let out = ToolOutput::new(json!("Results for: weather"));
        assert_eq!(out, "Results for: weather");
        assert_ne!(ToolOutput::new(json!(1)), "1");
    }

    #[test]
    fn test_slots_pair_calls_with_outcomes() {
        let result = ToolChainResult {
            calls: vec![ToolCall::new("a"), ToolCall::new("b")],
            results: vec![Some(ToolOutput::new(json!("ok"))), None],
            errors: vec![
                None,
                Some(ToolCallError::UnknownTool {
                    name: "b".into(),
                    available: vec!["a".into()],
                }),
            ],
            observation: Observation::default(),
        };
        assert_eq!(result.len(), 2);
        assert!(result.has_errors());
        assert_eq!(result.success_count(), 1);
        let names: Vec<(&str, bool)> = result
            .slots()
            .map(|(call, outcome)| (call.name.as_str(), outcome.is_ok()))
            .collect();
        assert_eq!(names, vec![("a", true), ("b", false)]);
    }
}
