//! Psych: a polite therapist-directory crawler
//!
//! This crate walks the paginated listing pages of a professional directory,
//! extracts one record per listing, and stores the results in a local SQLite
//! database that can be browsed in the terminal or queried with filters.

pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod record;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for psych operations
#[derive(Debug, Error)]
pub enum PsychError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] crawler::CacheError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Frontier exceeded its capacity of {capacity} URLs (likely a pagination loop)")]
    QueueOverflow { capacity: usize },

    #[error("Crawl worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("not enough location parameters to build a search URL (give --zip, --state with --county, or --state with --city)")]
    InsufficientLocation,

    #[error("Unsupported country '{0}': only 'us' or 'ca' are supported")]
    UnsupportedCountry(String),

    #[error("County must end with '-county' (e.g. 'king-county'), got '{0}'")]
    MalformedCounty(String),

    #[error("Seed URL {0} is outside the allowed domains")]
    SeedNotAllowed(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for psych operations
pub type Result<T> = std::result::Result<T, PsychError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::crawler::{crawl, Coordinator, CrawlReport};
pub use crate::record::{dedup_records, Predicate, Record, RecordFilter};
pub use crate::state::{CrawlState, DomainState};
pub use crate::url::{build_start_url, extract_domain, normalize_url, Location};
