use crate::config::types::{Config, CrawlDefaults, FetcherConfig, ServerConfig, UserAgentConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_crawl_defaults(&config.crawl)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind_address '{}' is not a socket address: {}",
            config.bind_address, e
        ))
    })?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 20, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

fn validate_crawl_defaults(config: &CrawlDefaults) -> Result<(), ConfigError> {
    if config.max_content_size_kib < 1 {
        return Err(ConfigError::Validation(
            "max_content_size_kib must be >= 1".to_string(),
        ));
    }

    if config.max_images < 1 || config.max_images > 50 {
        return Err(ConfigError::Validation(format!(
            "max_images must be between 1 and 50, got {}",
            config.max_images
        )));
    }

    if config.request_rate_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "request_rate_delay_ms must be <= 60000, got {}",
            config.request_rate_delay_ms
        )));
    }

    Ok(())
}
