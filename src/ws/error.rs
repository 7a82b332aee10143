use thiserror::Error;

/// Error codes a site returns when a web-service function is not available
const UNAVAILABLE_CODES: &[&str] = &["invalidfunction", "accessexception", "servicenotavailable"];

#[derive(Debug, Error)]
pub enum WsError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{function} failed with {errorcode}: {message}")]
    Remote {
        function: String,
        errorcode: String,
        message: String,
    },

    #[error("Invalid response from {function}: {source}")]
    Decode {
        function: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl WsError {
    /// The endpoint does not exist on this site (e.g. older server version)
    pub fn is_unavailable(&self) -> bool {
        match self {
            WsError::Status(404) => true,
            WsError::Remote { errorcode, .. } => UNAVAILABLE_CODES.contains(&errorcode.as_str()),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for WsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WsError::Timeout
        } else {
            WsError::Request(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, WsError>;
