//! Text format port — splits raw model output into named sections.
//!
//! The upstream collaborator that isolates tool-call text before the
//! toolchain sees it. Implementations only provide
//! [`parse_sections`](TextFormat::parse_sections); the provided
//! [`parse`](TextFormat::parse) keeps the `format` parse-error counters of
//! the context accurate.

use crate::context::ExecutionContext;
use agentctx_domain::{ErrorKind, ParseCategory};
use std::collections::BTreeMap;
use thiserror::Error;

/// Section name → bodies, in the order they appeared.
pub type Sections = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("no sections found in model output")]
    NoSectionsFound,

    #[error("section '{tag}' appears {count} times")]
    AmbiguousTags { tag: String, count: usize },

    #[error("malformed model output: {0}")]
    Malformed(String),
}

impl FormatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormatError::NoSectionsFound => ErrorKind::NoSectionsFound,
            FormatError::AmbiguousTags { .. } => ErrorKind::AmbiguousTags,
            FormatError::Malformed(_) => ErrorKind::InvalidWireSyntax,
        }
    }
}

pub trait TextFormat: Send + Sync {
    fn name(&self) -> &'static str;

    /// Split `raw` into sections, without touching any context.
    fn parse_sections(&self, raw: &str) -> Result<Sections, FormatError>;

    /// Split `raw` and record the outcome on `ctx`.
    ///
    /// A failure counts as a `format` parse error; a success ends the
    /// `format` error streak.
    fn parse(&self, ctx: &ExecutionContext, raw: &str) -> Result<Sections, FormatError> {
        match self.parse_sections(raw) {
            Ok(sections) => {
                ctx.record_parse_success(ParseCategory::Format);
                Ok(sections)
            }
            Err(e) => {
                ctx.record_parse_error(ParseCategory::Format, e.to_string());
                Err(e)
            }
        }
    }
}
