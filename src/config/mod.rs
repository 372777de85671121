//! Configuration module for Spindle
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Configuration is read once at startup and treated as immutable
//! thereafter; every component receives it by shared reference.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
