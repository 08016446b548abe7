use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the configuration file if it exists, otherwise returns validated defaults
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_default(path: &Path) -> ConfigResult<Config> {
    if path.exists() {
        tracing::debug!("Loading configuration from {}", path.display());
        load_config(path)
    } else {
        tracing::debug!(
            "No configuration at {}, using built-in defaults",
            path.display()
        );
        let config = Config::default();
        validate(&config)?;
        Ok(config)
    }
}
