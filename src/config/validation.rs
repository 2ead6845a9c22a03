use crate::config::types::{Config, ListingConfig, RedisConfig, UserAgentConfig, WorkerConfig};
use crate::ConfigError;
use url::Url;

const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_listing_config(&config.listing)?;
    validate_worker_config(&config.workers)?;
    validate_redis_config(&config.redis)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the listing page settings
fn validate_listing_config(config: &ListingConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing.url '{}': {}", config.url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Listing url '{}' must use http or https",
            config.url
        )));
    }

    if config.archive_suffix.is_empty() {
        return Err(ConfigError::Validation(
            "listing.archive-suffix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker pool settings
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.count < 1 || config.count > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers.count must be between 1 and {}, got {}",
            MAX_WORKERS, config.count
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "workers.queue-capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates key-value store settings
fn validate_redis_config(config: &RedisConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid redis.url '{}': {}", config.url, e)))?;

    if !matches!(url.scheme(), "redis" | "rediss" | "unix" | "redis+unix") {
        return Err(ConfigError::Validation(format!(
            "Unsupported redis url scheme '{}'",
            url.scheme()
        )));
    }

    for (name, value) in [
        ("downloaded-key", &config.downloaded_key),
        ("processed-key", &config.processed_key),
        ("queue", &config.queue),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!(
                "redis.{} cannot be empty",
                name
            )));
        }
    }

    // A shared hash would let an entry name shadow an archive link
    if config.downloaded_key == config.processed_key {
        return Err(ConfigError::Validation(format!(
            "redis.downloaded-key and redis.processed-key must differ, both are '{}'",
            config.downloaded_key
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "user-agent.crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid user-agent.contact-url: {}", e)))?;
    }

    Ok(())
}
