//! Small helpers for logging and URL handling.

use url::Url;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Host (with port, if any) of a URL, e.g. `https://lite.cnn.com/x` -> `lite.cnn.com`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Make an href absolute.
///
/// Hrefs that already carry a scheme are returned unchanged. Anything else is
/// resolved against `https://{domain}/`.
pub fn resolve_href(domain: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    let base = Url::parse(&format!("https://{domain}/")).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('é'));
        assert!(result.ends_with("…(+18 bytes)"));
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(
            domain_of("https://lite.cnn.com/2025/05/06/story"),
            Some("lite.cnn.com".to_string())
        );
        assert_eq!(
            domain_of("http://127.0.0.1:8080/news"),
            Some("127.0.0.1:8080".to_string())
        );
        assert_eq!(domain_of("not a url"), None);
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("example.com", "/world/story-1").as_deref(),
            Some("https://example.com/world/story-1")
        );
        assert_eq!(
            resolve_href("example.com", "story-2").as_deref(),
            Some("https://example.com/story-2")
        );
        assert_eq!(
            resolve_href("example.com", "http://other.org/x").as_deref(),
            Some("http://other.org/x")
        );
        assert_eq!(
            resolve_href("example.com", "//cdn.example.com/y").as_deref(),
            Some("https://cdn.example.com/y")
        );
        assert_eq!(resolve_href("example.com", "  "), None);
    }
}
