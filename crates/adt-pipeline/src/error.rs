//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a whole stage.
///
/// Per-recording failures never surface here; they are collected into the
/// stage reports instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] adt_models::ManifestError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] adt_fetch::FetchError),

    #[error("Failed to write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn output_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source,
        }
    }
}
