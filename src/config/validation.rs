use crate::config::types::{Config, CrawlerConfig, MarkerConfig, OutputConfig, PollConfig, SiteConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_poll_config(&config.poll)?;
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    validate_markers(&config.markers)?;
    Ok(())
}

/// Validates crawl engine configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 32 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 32, got {}",
            config.workers
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.retry_max_delay_ms < config.retry_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_max_delay_ms ({}) must be >= retry_delay_ms ({})",
            config.retry_max_delay_ms, config.retry_delay_ms
        )));
    }

    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.node_timeout_ms < config.navigation_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "node_timeout_ms ({}) must be >= navigation_timeout_ms ({})",
            config.node_timeout_ms, config.navigation_timeout_ms
        )));
    }

    if config.max_depth == Some(0) {
        return Err(ConfigError::Validation(
            "max_depth must be >= 1 when set".to_string(),
        ));
    }

    if config.progress_every == 0 {
        return Err(ConfigError::Validation(
            "progress_every must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates stability poll configuration
fn validate_poll_config(config: &PollConfig) -> Result<(), ConfigError> {
    if config.stable_reads < 2 {
        return Err(ConfigError::Validation(format!(
            "stable_reads must be >= 2 (two equal observations), got {}",
            config.stable_reads
        )));
    }

    if config.max_polls < config.stable_reads {
        return Err(ConfigError::Validation(format!(
            "max_polls ({}) must be >= stable_reads ({})",
            config.max_polls, config.stable_reads
        )));
    }

    Ok(())
}

/// Validates target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use HTTP or HTTPS, got '{}'",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for root in &config.roots {
        if root.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "root entries must have a name".to_string(),
            ));
        }

        base.join(&root.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid root url '{}': {}", root.url, e))
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.database_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "database_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every marker is a parseable CSS selector
fn validate_markers(markers: &MarkerConfig) -> Result<(), ConfigError> {
    for (key, selector) in markers.entries() {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "marker '{}' is not a valid CSS selector: '{}'",
                key, selector
            )));
        }
    }
    Ok(())
}
