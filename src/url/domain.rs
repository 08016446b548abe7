use url::Url;

/// Extracts the lowercase host of a URL
///
/// Returns `None` for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use psych::url::extract_domain;
///
/// let url = Url::parse("https://WWW.PsychologyToday.com/us/therapists").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.psychologytoday.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://www.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
    }

    #[test]
    fn test_extract_ignores_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_no_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(extract_domain(&url), None);
    }
}
