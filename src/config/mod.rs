//! Configuration module for Zip-Ingest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use zip_ingest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ingest.toml")).unwrap();
//! println!("Listing page: {}", config.listing.url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FailurePolicy, ListingConfig, RedisConfig, UserAgentConfig, WorkerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
