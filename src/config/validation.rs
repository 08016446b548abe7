use crate::config::types::{Config, CrawlerConfig, ExtractionRules, SiteConfig};
use crate::url::validate_country;
use crate::crawler::CompiledRules;
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_site_config(&config.site)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.max_parallelism < 1 || config.max_parallelism > 16 {
        return Err(ConfigError::Validation(format!(
            "max_parallelism must be between 1 and 16, got {}",
            config.max_parallelism
        )));
    }

    if config.request_delay < 100 {
        return Err(ConfigError::Validation(format!(
            "request_delay must be >= 100ms, got {}ms",
            config.request_delay
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue_capacity must be >= 1".to_string(),
        ));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1s".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.allowed_domains.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_domains must list at least one domain".to_string(),
        ));
    }

    for domain in &config.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

/// Validates target site configuration
fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    validate_country(&config.country)?;

    Ok(())
}

/// Checks that every selector in the rule set parses
fn validate_selectors(rules: &ExtractionRules) -> ConfigResult<()> {
    CompiledRules::compile(rules).map(|_| ())
}

/// Validates a domain pattern (supports wildcards)
pub fn validate_domain_pattern(pattern: &str) -> ConfigResult<()> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> ConfigResult<()> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
