//! Configuration module for psych
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use psych::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("psych.toml")).unwrap();
//! println!("Crawler will use {} worker slots", config.crawler.max_parallelism);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ExtractionRules, SiteConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::{validate, validate_domain_pattern};
