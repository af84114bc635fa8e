//! Configuration module for Magpie
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every setting has a built-in default, so a missing config file (or
//! a partial one) still yields a runnable configuration.
//!
//! # Example
//!
//! ```no_run
//! use magpie::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("magpie.toml")).unwrap();
//! println!("Polling every {} seconds", config.crawler.poll_period_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DiscoveryStrategy, OutputConfig, TargetConfig};

// Re-export parser functions
pub use parser::load_config;

// Re-export validation for callers that mutate a config after loading
pub use validation::validate;
