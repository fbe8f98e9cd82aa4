//! Fetch error types.

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Per-asset network or storage failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to configure HTTP client: {0}")]
    ClientConfig(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Checksum mismatch for {url}: expected sha1 {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Network(e) if e.is_timeout())
    }
}

impl From<zip::result::ZipError> for FetchError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}
