use url::Url;

/// A URL is analyzable only when it parses with both a scheme and a host.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.has_host() && !parsed.scheme().is_empty(),
        Err(_) => false,
    }
}

/// Normalize a URL for comparison: scheme + host + path (+ query), fragment
/// dropped, trailing slash trimmed. Idempotent: normalizing a normalized
/// URL yields the same string. Unparseable input is returned unchanged.
pub fn normalize_url(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(p) => p,
        Err(_) => return url.to_string(),
    };

    let host = parsed.host_str().unwrap_or_default();
    let mut normalized = format!("{}://{}{}", parsed.scheme(), host, parsed.path());
    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    normalized.trim_end_matches('/').to_string()
}

/// Host portion of a URL, lowercased; empty string when unparseable.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("example.com/page"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_normalize_drops_fragment_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://example.com/page/#section"),
            "https://example.com/page"
        );
        assert_eq!(
            normalize_url("https://example.com/"),
            "https://example.com"
        );
    }

    #[test]
    fn test_normalize_keeps_query() {
        assert_eq!(
            normalize_url("https://example.com/search?q=claim#top"),
            "https://example.com/search?q=claim"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let urls = [
            "https://example.com/page/?a=1#frag",
            "https://example.com",
            "https://example.com/a/b/c/",
        ];
        for url in urls {
            let once = normalize_url(url);
            assert_eq!(normalize_url(&once), once);
        }
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://Example.COM/page"), "example.com");
        assert_eq!(extract_domain("garbage"), "");
    }
}
