//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests for listing pages
//! - Classifying failures so the coordinator can count and log them

use crate::config::CrawlerConfig;
use crate::crawler::cache::CachedResponse;
use chrono::Utc;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Connect timeout applied to every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered with a 2xx status
    Success(CachedResponse),

    /// The server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// No usable response (connection refused, timeout, truncated body)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use psych::config::CrawlerConfig;
/// use psych::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// Redirects are followed by the client; the returned entry is keyed by the
/// requested URL so the cache and frontier agree on it.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The (normalized) URL to fetch
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::NetworkError { error: describe(&e) },
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    match response.text().await {
        Ok(body) => FetchResult::Success(CachedResponse {
            url: url.to_string(),
            status: status.as_u16(),
            headers,
            body,
            fetched_at: Utc::now(),
        }),
        Err(e) => FetchResult::NetworkError { error: describe(&e) },
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
