//! Media errors.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe could not read the video: {stderr}")]
    ProbeFailed { stderr: String },

    /// The video could not be opened, or not a single frame came out.
    #[error("frame extraction failed for {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("invalid sampling rate: {0}")]
    InvalidSampling(String),

    #[error("video not found: {0}")]
    VideoNotFound(PathBuf),

    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable ffprobe output or frame timeline.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn extraction_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The decoder ran and failed, as opposed to not being available.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, MediaError::FfmpegFailed { .. })
    }
}
