//! URL handling module for psych
//!
//! This module provides URL normalization (frontier and cache keys), domain
//! extraction, allowed-domain matching, and composition of the search start
//! URL from location parameters.

mod domain;
mod location;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use location::{build_start_url, validate_country, Location};
pub use matcher::{is_allowed_domain, matches_wildcard};
pub use normalize::normalize_url;

use ::url::Url;

/// Resolves an href found on a page to an absolute HTTP(S) URL
///
/// Returns `None` for links that cannot be followed:
/// - empty or fragment-only hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` schemes
/// - hrefs that do not resolve to HTTP(S)
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}
