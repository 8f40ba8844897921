//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries. Used for trace/log previews of tool input
/// and output.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Render a JSON value as a short single-line preview.
pub fn preview_value(value: &serde_json::Value, max_len: usize) -> String {
    match value {
        serde_json::Value::String(s) => truncate(s, max_len),
        other => truncate(&other.to_string(), max_len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("query", 10), "query");
        assert_eq!(truncate("results for weather", 10), "results...");
    }

    #[test]
    fn test_truncate_multibyte_boundary() {
        // "é" is two bytes; a cut inside it must back off to the boundary
        let s = "ééééé";
        let out = truncate(s, 6);
        assert!(out.ends_with("..."));
        assert!(out.starts_with("é"));
    }

    #[test]
    fn test_preview_value() {
        let v = serde_json::json!({"query": "weather"});
        assert_eq!(preview_value(&v, 100), r#"{"query":"weather"}"#);
        assert_eq!(preview_value(&serde_json::json!("plain"), 100), "plain");
    }
}
