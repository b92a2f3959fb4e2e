//! Small helpers shared across the engine.

/// Trimmed text, or `None` when only whitespace remains.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Whether the value names an `http://` or `https://` endpoint.
pub fn has_http_scheme(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Cap free-form server text so it fits an error banner or a log line.
pub fn compact_text(value: &str) -> String {
    const MAX_CHARS: usize = 180;
    value.trim().chars().take(MAX_CHARS).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_trims_and_rejects_whitespace() {
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(""), None);
        assert_eq!(
            non_blank(" http://localhost:3000 "),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn has_http_scheme_accepts_both_schemes() {
        assert!(has_http_scheme("http://localhost"));
        assert!(has_http_scheme("https://example.com"));
        assert!(!has_http_scheme("ws://example.com"));
        assert!(!has_http_scheme("example.com"));
    }

    #[test]
    fn compact_text_caps_length() {
        let long = "x".repeat(400);
        assert_eq!(compact_text(&long).len(), 180);
        assert_eq!(compact_text("  short  "), "short");
    }
}
