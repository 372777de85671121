//! Spindle: a continuously-running web crawler
//!
//! This crate implements a crawler that drains a persistent frontier of
//! URLs, fetches and parses pages concurrently, stores structured page
//! records, and feeds newly discovered URLs back into the frontier,
//! indefinitely.

pub mod config;
pub mod crawler;
pub mod model;
pub mod queue;
pub mod storage;

use thiserror::Error;

/// Main error type for Spindle operations
#[derive(Debug, Error)]
pub enum SpindleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

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
}

/// Result type alias for Spindle operations
pub type Result<T> = std::result::Result<T, SpindleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CrawlTask, FetchOutcome, ImageRef, Page, TaskStatus};
pub use queue::CrawlQueue;
