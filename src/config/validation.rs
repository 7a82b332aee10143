use super::models::{Config, StorageProvider};
use reqwest::Url;
use thiserror::Error;

/// Content types this build ships handlers for
const KNOWN_HANDLERS: &[&str] = &["book"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid site URL '{url}': {reason}")]
    InvalidSiteUrl { url: String, reason: String },

    #[error("http.max_retries must be at least 1")]
    ZeroRetries,

    #[error("Local storage requires a non-empty root path")]
    EmptyStorageRoot,

    #[error("download.max_file_bytes must be positive")]
    InvalidMaxFileBytes,

    #[error("cache.retention_days must be positive")]
    InvalidRetention,

    #[error("Unknown handler '{0}' in [handlers]")]
    UnknownHandler(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_site(config)?;
    validate_http(config)?;
    validate_storage(config)?;
    validate_limits(config)?;
    validate_handlers(config)?;
    Ok(())
}

fn validate_site(config: &Config) -> Result<(), ValidationError> {
    let url = Url::parse(&config.site.url).map_err(|e| ValidationError::InvalidSiteUrl {
        url: config.site.url.clone(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::InvalidSiteUrl {
            url: config.site.url.clone(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    if config.http.max_retries == 0 {
        return Err(ValidationError::ZeroRetries);
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.provider == StorageProvider::Local
        && config.storage.root.as_os_str().is_empty()
    {
        return Err(ValidationError::EmptyStorageRoot);
    }
    Ok(())
}

fn validate_limits(config: &Config) -> Result<(), ValidationError> {
    if config.download.max_file_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxFileBytes);
    }
    if config.cache.retention_days == 0 {
        return Err(ValidationError::InvalidRetention);
    }
    Ok(())
}

fn validate_handlers(config: &Config) -> Result<(), ValidationError> {
    for name in config.handlers.keys() {
        if !KNOWN_HANDLERS.contains(&name.as_str()) {
            return Err(ValidationError::UnknownHandler(name.clone()));
        }
    }
    Ok(())
}
