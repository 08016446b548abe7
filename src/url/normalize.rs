use crate::{UrlError, UrlResult};
use url::Url;

/// Query parameters that never change which listing page is served
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL so equivalent spellings share one frontier and cache key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host (the `www.` prefix is kept, since allowed domains
///    may list it explicitly)
/// 3. Collapse empty and dot path segments; drop a trailing slash except on
///    the root
/// 4. Remove the fragment
/// 5. Drop tracking parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`), sort the
///    rest by key and drop an empty query
///
/// # Examples
///
/// ```
/// use psych::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.com/us/therapists/wa/?page=2#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/us/therapists/wa?page=2");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes dot segments, repeated slashes and a trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
