/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Recover a JSON value from model output that may wrap it in prose or
/// code fences. Tries, in order: direct parse, fence-stripped parse, the
/// outermost `{...}` span.
pub fn recover_json(text: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    let stripped = strip_code_blocks(text);
    if let Ok(value) = serde_json::from_str(stripped) {
        return Some(value);
    }

    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_truncate_within_bounds() {
        let text = "Hello";
        assert_eq!(truncate_to_char_boundary(text, 100), "Hello");
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn test_recover_json_direct() {
        let value = recover_json(r#"{"verdict": "true"}"#).unwrap();
        assert_eq!(value["verdict"], "true");
    }

    #[test]
    fn test_recover_json_fenced() {
        let value = recover_json("```json\n{\"score\": 85}\n```").unwrap();
        assert_eq!(value["score"], 85);
    }

    #[test]
    fn test_recover_json_embedded_in_prose() {
        let text = "Here is my analysis:\n{\"verdict\": \"false\", \"confidence\": 0.9}\nHope that helps.";
        let value = recover_json(text).unwrap();
        assert_eq!(value["verdict"], "false");
    }

    #[test]
    fn test_recover_json_none_for_plain_text() {
        assert!(recover_json("no json here at all").is_none());
    }

    #[test]
    fn test_recover_json_array() {
        let value = recover_json(r#"["a", "b"]"#).unwrap();
        assert!(value.is_array());
    }
}
