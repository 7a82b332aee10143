//! Module file downloads
//!
//! [`FileDownloader`] is the shared download machinery behind every resource
//! handler: it fetches each file over HTTP, stores it and records it in the
//! file index so unchanged files are skipped next time.

mod files;
mod http;

pub use files::FileDownloader;
pub use http::HttpClient;

use thiserror::Error;

use crate::cache::CacheError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("{url} is {size} bytes, limit is {limit}")]
    TooLarge { url: String, size: u64, limit: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl DownloadError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::RequestFailed(_) | DownloadError::Timeout => true,
            DownloadError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Outcome of downloading one module's files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}
