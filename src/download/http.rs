//! HTTP client for module file transfers

use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::DownloadError;
use crate::config::HttpConfig;

pub type Result<T> = std::result::Result<T, DownloadError>;

/// First retry delay; doubles on every further attempt
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// HTTP downloader with retry
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| DownloadError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    /// Download a file with retry.
    ///
    /// `label` is what gets logged; the request URL may carry a token.
    pub async fn download(&self, url: &str, label: &str) -> Result<Bytes> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.download_once(url, label).await {
                Ok(bytes) => {
                    if attempts > 1 {
                        debug!(url = label, attempts, "Download succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) if !e.is_retryable() || attempts >= self.max_retries => {
                    warn!(url = label, attempts, error = %e, "Download failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(url = label, attempts, error = %e, "Download failed, retrying");
                    tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempts - 1)).await;
                }
            }
        }
    }

    async fn download_once(&self, url: &str, label: &str) -> Result<Bytes> {
        debug!(url = label, "Starting download");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::Timeout
            } else if e.is_redirect() {
                DownloadError::TooManyRedirects
            } else {
                DownloadError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: label.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError::RequestFailed(format!("Failed to read body: {}", e)))?;

        debug!(url = label, size = bytes.len(), "Download completed");

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_never_zero() {
        let config = HttpConfig {
            max_retries: 0,
            ..HttpConfig::default()
        };
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(client.max_retries, 1);
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(BASE_BACKOFF * 2u32.pow(0), Duration::from_millis(500));
        assert_eq!(BASE_BACKOFF * 2u32.pow(2), Duration::from_secs(2));
    }
}
