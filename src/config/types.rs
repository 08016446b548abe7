use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for psych
///
/// Every section is optional; a missing section takes its defaults, so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub selectors: ExtractionRules,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Directory for memoized raw responses; `None` disables the cache
    #[serde(rename = "cache-dir", default)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of concurrent fetches (worker slots and per-domain limit)
    #[serde(rename = "max-parallelism", default = "default_max_parallelism")]
    pub max_parallelism: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Maximum number of URLs the frontier may hold
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Domains the crawler refuses to leave ("example.com" or "*.example.com")
    #[serde(rename = "allowed-domains", default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site root the search URL is composed under
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Default country segment ("us" or "ca")
    #[serde(default = "default_country")]
    pub country: String,
}

/// CSS selectors used to pull listings out of a results page
///
/// Row-scoped selectors (`info`, `features`, `contact`) are evaluated inside
/// each `row` match; field selectors are evaluated inside their region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExtractionRules {
    pub row: String,
    pub info: String,
    pub title: String,
    pub credentials: String,
    pub verified: String,
    pub statement: String,
    /// Anchor inside the info region whose `href` is the profile link
    pub link: String,
    pub features: String,
    pub accepting: String,
    pub contact: String,
    pub phone: String,
    /// Evaluated against the whole row
    pub location: String,
    pub pagination: String,
    #[serde(rename = "pagination-link")]
    pub pagination_link: String,
}

fn default_max_parallelism() -> u32 {
    2
}

fn default_request_delay() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_allowed_domains() -> Vec<String> {
    vec![
        "psychologytoday.com".to_string(),
        "www.psychologytoday.com".to_string(),
    ]
}

fn default_user_agent() -> String {
    format!("psych/{}", env!("CARGO_PKG_VERSION"))
}

fn default_base_url() -> String {
    "https://www.psychologytoday.com".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_parallelism: default_max_parallelism(),
            request_delay: default_request_delay(),
            queue_capacity: default_queue_capacity(),
            request_timeout: default_request_timeout(),
            allowed_domains: default_allowed_domains(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            country: default_country(),
        }
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            row: ".results-row".to_string(),
            info: ".results-row-info".to_string(),
            title: ".profile-title".to_string(),
            credentials: ".profile-subtitle-credentials".to_string(),
            verified: ".verified-badge".to_string(),
            statement: ".statements".to_string(),
            link: "a[href]".to_string(),
            features: ".profile-features".to_string(),
            accepting: ".accepting-appointments".to_string(),
            contact: ".results-row-contact".to_string(),
            phone: ".results-row-mob".to_string(),
            location: ".profile-location".to_string(),
            pagination: ".pagination".to_string(),
            pagination_link: "a[href]".to_string(),
        }
    }
}
