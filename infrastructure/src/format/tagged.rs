//! `<name>…</name>` section extraction.

use agentctx_application::{FormatError, Sections, TextFormat};
use std::collections::BTreeSet;

/// Splits model output into sections delimited by XML-style tags.
///
/// Text outside tags is ignored, as is a `<` that does not start a tag
/// name. A section body runs to the first matching closing tag, so nested
/// tags of a different name stay part of the body. Bodies are trimmed.
#[derive(Debug, Clone, Default)]
pub struct TaggedSectionFormat {
    strict: bool,
    tags: BTreeSet<String>,
}

impl TaggedSectionFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject output where any section appears more than once.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Only extract these tags; every other tag is treated as text.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    fn accepts(&self, tag: &str) -> bool {
        self.tags.is_empty() || self.tags.contains(tag)
    }
}

/// Tag name at the start of `s`, if it is one.
fn tag_name(s: &str) -> Option<&str> {
    let end = s
        .char_indices()
        .find(|&(i, c)| {
            let valid = if i == 0 {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_' || c == '-'
            };
            !valid
        })
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    (end > 0).then(|| &s[..end])
}

impl TextFormat for TaggedSectionFormat {
    fn name(&self) -> &'static str {
        "tagged"
    }

    fn parse_sections(&self, raw: &str) -> Result<Sections, FormatError> {
        let mut sections = Sections::new();
        let mut rest = raw;

        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let Some(name) = tag_name(after) else {
                rest = after;
                continue;
            };
            let Some(body_and_rest) = after[name.len()..].strip_prefix('>') else {
                rest = after;
                continue;
            };
            if !self.accepts(name) {
                rest = body_and_rest;
                continue;
            }

            let close = format!("</{}>", name);
            let Some(end) = body_and_rest.find(&close) else {
                return Err(FormatError::Malformed(format!("unclosed tag <{}>", name)));
            };
            sections
                .entry(name.to_string())
                .or_default()
                .push(body_and_rest[..end].trim().to_string());
            rest = &body_and_rest[end + close.len()..];
        }

        if sections.is_empty() {
            return Err(FormatError::NoSectionsFound);
        }
        if self.strict
            && let Some((tag, bodies)) = sections.iter().find(|(_, bodies)| bodies.len() > 1)
        {
            return Err(FormatError::AmbiguousTags {
                tag: tag.clone(),
                count: bodies.len(),
            });
        }
        Ok(sections)
    }
}
