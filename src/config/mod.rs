//! Configuration management for coursefetch
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use coursefetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Site: {}", config.site.url);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `COURSEFETCH__<section>__<key>`:
//! - `COURSEFETCH__SITE__URL=https://school.example.com`
//! - `COURSEFETCH__DOWNLOAD__MAX_FILE_BYTES=20MB`
//!
//! The web-service token is only read from `COURSEFETCH_TOKEN` (or
//! `MOODLE_TOKEN`).
//!
//! # Configuration File
//!
//! Loaded from `config/coursefetch.toml` unless `COURSEFETCH_CONFIG` points
//! elsewhere.

mod models;
mod size;
mod sources;
mod validation;

pub use models::{
    CacheConfig, Config, DownloadConfig, HandlerConfig, HttpConfig, SiteConfig, StorageConfig,
    StorageProvider, TelemetryConfig,
};
pub use size::{ByteSize, SizeParseError};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Secrets are still taken from the environment.
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let mut config = sources::load_from_sources(path.as_ref())?;
        sources::load_secrets(&mut config);
        validation::validate(&config)?;
        Ok(config)
    }
}
