use crate::config::types::{Config, CrawlerConfig, DiscoveryStrategy, OutputConfig, TargetConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_target_config(&config.target)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.poll_period_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "poll_period_secs must be >= 1, got {}",
            config.poll_period_secs
        )));
    }

    if config.posts_per_cycle < 1 || config.posts_per_cycle > 500 {
        return Err(ConfigError::Validation(format!(
            "posts_per_cycle must be between 1 and 500, got {}",
            config.posts_per_cycle
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    Ok(())
}

/// Validates target site configuration
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.base_url, "base_url")?;

    match (&config.discovery, &config.index_url) {
        (DiscoveryStrategy::Index, None) => Err(ConfigError::Validation(
            "index_url is required when discovery = \"index\"".to_string(),
        )),
        (DiscoveryStrategy::Index, Some(url)) => validate_http_url(url, "index_url"),
        (DiscoveryStrategy::Listing, _) => Ok(()),
    }
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(url: &url::Url, field: &str) -> Result<(), ConfigError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )));
    }
    Ok(())
}
