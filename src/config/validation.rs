use crate::config::types::{Config, CrawlerConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_start_urls(&config.start_urls)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.fetch_workers < 1 || config.fetch_workers > 1_000 {
        return Err(ConfigError::Validation(format!(
            "fetch_workers must be between 1 and 1000, got {}",
            config.fetch_workers
        )));
    }

    if config.parse_workers < 1 || config.parse_workers > 1_000 {
        return Err(ConfigError::Validation(format!(
            "parse_workers must be between 1 and 1000, got {}",
            config.parse_workers
        )));
    }

    if config.scale_factor < 1 {
        return Err(ConfigError::Validation(format!(
            "scale_factor must be >= 1, got {}",
            config.scale_factor
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.queue_wait_ms == 0 {
        return Err(ConfigError::Validation(
            "queue_wait_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed URLs
///
/// Seeds must parse as absolute URLs with an http or https scheme.
/// Schemeless URLs are rejected here as well as at runtime by the
/// frontier manager.
fn validate_start_urls(urls: &[String]) -> Result<(), ConfigError> {
    for seed in urls {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use an http or https scheme",
                seed
            )));
        }
    }

    Ok(())
}
