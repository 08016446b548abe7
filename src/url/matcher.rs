/// Checks if a domain matches a wildcard pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches "example.com" and any of its
///    subdomains, however deeply nested
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use psych::url::matches_wildcard;
///
/// assert!(matches_wildcard("psychologytoday.com", "psychologytoday.com"));
/// assert!(!matches_wildcard("psychologytoday.com", "www.psychologytoday.com"));
/// assert!(matches_wildcard("*.psychologytoday.com", "www.psychologytoday.com"));
/// assert!(!matches_wildcard("*.psychologytoday.com", "psychologytoday.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .map_or(false, |head| head.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns true if the domain matches any of the allowed patterns
pub fn is_allowed_domain(domain: &str, allowed: &[String]) -> bool {
    allowed
        .iter()
        .any(|pattern| matches_wildcard(&pattern.to_lowercase(), domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "other.com"));
        assert!(!matches_wildcard("example.com", "blog.example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "www.example.com"));
        assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
    }

    #[test]
    fn test_wildcard_no_partial_match() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
        assert!(!matches_wildcard("*.example.com", ""));
    }

    #[test]
    fn test_is_allowed_domain() {
        let allowed = vec![
            "psychologytoday.com".to_string(),
            "www.psychologytoday.com".to_string(),
        ];

        assert!(is_allowed_domain("psychologytoday.com", &allowed));
        assert!(is_allowed_domain("www.psychologytoday.com", &allowed));
        assert!(!is_allowed_domain("cdn.psychologytoday.com", &allowed));
        assert!(!is_allowed_domain("example.com", &allowed));
    }

    #[test]
    fn test_is_allowed_domain_pattern_case() {
        let allowed = vec!["*.Example.COM".to_string()];
        assert!(is_allowed_domain("www.example.com", &allowed));
    }
}
