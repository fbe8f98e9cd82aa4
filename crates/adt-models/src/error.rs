//! Error types for manifest parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Malformed or incomplete manifest. Always fatal for a run.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Manifest format error: {0}")]
    Format(String),
}

impl ManifestError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}
