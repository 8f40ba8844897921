//! Wire syntax adapters for tool-call sections.
//!
//! | Syntax | Single call | Parallel calls |
//! |--------|-------------|----------------|
//! | [`JsonSyntax`] | `{"tool": "...", "args": {...}}` | top-level array of the same |
//! | [`YamlSyntax`] | `tool:` / `args:` mapping | top-level sequence of mappings |

mod json;
mod yaml;

#[cfg(test)]
mod fixtures;

pub use json::JsonSyntax;
pub use yaml::YamlSyntax;

use agentctx_application::{SyntaxKind, WireSyntax};
use std::sync::Arc;

/// Syntax adapter for a configured [`SyntaxKind`].
pub fn syntax_for(kind: SyntaxKind) -> Arc<dyn WireSyntax> {
    match kind {
        SyntaxKind::Json => Arc::new(JsonSyntax),
        SyntaxKind::Yaml => Arc::new(YamlSyntax),
    }
}

/// Strip one surrounding Markdown code fence (```` ```json ````), if present.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `yaml`) on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Prepare a YAML tool-call section for decoding.
///
/// Unlike [`strip_code_fence`] this never trims content lines: indentation
/// is significant, and the document always ends in a newline so a block
/// scalar (`|`, `>`) in the last position keeps its final line break.
/// Returns an empty string when the section holds no content.
pub(crate) fn yaml_document(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let mut body = trim_blank_lines(&lines);
    if let [first, inner @ .., last] = body
        && first.trim_start().starts_with("```")
        && last.trim() == "```"
    {
        body = trim_blank_lines(inner);
    }
    if body.is_empty() {
        return String::new();
    }

    let mut document = body.join("\n");
    document.push('\n');
    document
}

fn trim_blank_lines<'a, 'b>(lines: &'b [&'a str]) -> &'b [&'a str] {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |last| last + 1);
    &lines[start..end]
}
