//! Magpie: a top-post hoarder for news aggregators
//!
//! This crate implements a polling crawler that periodically discovers the
//! top posts on a news aggregation site, then downloads each post's linked
//! article together with every URL referenced in its comment thread. Each
//! resource is persisted into a per-post directory, and directory existence
//! doubles as the durable "already captured" marker between runs.

pub mod config;
pub mod crawler;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Magpie operations
#[derive(Debug, Error)]
pub enum MagpieError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to create download root {path}: {source}")]
    DownloadRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

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

/// Result type alias for Magpie operations
pub type Result<T> = std::result::Result<T, MagpieError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawler, FetchError, PostId};
