//! Annotation error types.

use std::path::PathBuf;

use adt_models::ObjectUid;
use thiserror::Error;

/// Result type for annotation operations.
pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// Missing or inconsistent ground truth for a recording.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("instances.json not found at {0}")]
    MissingInstances(PathBuf),

    #[error("Invalid instances file {path}: {reason}")]
    InvalidInstances { path: PathBuf, reason: String },

    #[error("Annotation table not found at {0}")]
    MissingTable(PathBuf),

    #[error("Column `{column}` missing from {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Invalid row {line} in {path}: {reason}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// A per-frame table references an object absent from instances.json.
    #[error("Object {uid} referenced in frame {frame} is not in instances.json")]
    UnknownObject { uid: ObjectUid, frame: u32 },

    /// A table row references an object absent from instances.json,
    /// whether or not any sampled frame lands on that row.
    #[error("Object {uid} referenced in {table} is not in instances.json")]
    UndefinedObject { uid: ObjectUid, table: PathBuf },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnnotationError {
    pub fn invalid_row(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn missing_column(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            path: path.into(),
            column: column.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
