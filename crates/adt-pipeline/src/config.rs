//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use adt_annotations::{TableFilter, DEFAULT_STREAM_ID};
use adt_fetch::DownloaderConfig;
use adt_media::SamplingRate;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::prompt::{PromptTemplate, DEFAULT_PROMPT_TEMPLATE};

/// Default number of recordings fetched per run.
pub const DEFAULT_MAX_DOWNLOAD: usize = 10;

/// Frame rate assumed when a recording has no timeline sidecar.
pub const DEFAULT_FALLBACK_FPS: f64 = 30.0;

/// Configuration shared by the fetch and prepare stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the on-disk dataset, one subdirectory per recording
    pub dataset_dir: PathBuf,
    /// Upper bound on recordings fetched per run
    pub max_download: usize,
    /// Timeout for a single asset request
    pub request_timeout: Duration,
    /// Frame sampling used by the extractor
    pub sampling: SamplingRate,
    /// Directory receiving `dataset.json`
    pub output_dir: PathBuf,
    /// Prompt template with `{objects}` / `{activity}` placeholders
    pub prompt_template: PromptTemplate,
    /// Annotation stream kept when reading bounding boxes. `None` keeps all
    pub stream_id: Option<String>,
    /// Minimum visibility ratio for an annotation row to count
    pub min_visibility: f64,
    /// Write absolute image paths instead of paths relative to `dataset_dir`
    pub absolute_image_paths: bool,
    /// Frame rate assumed when `frames.json` is missing
    pub fallback_fps: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("aria_dataset"),
            max_download: DEFAULT_MAX_DOWNLOAD,
            request_timeout: Duration::from_secs(60),
            sampling: SamplingRate::default(),
            output_dir: PathBuf::from("prepared_dataset"),
            prompt_template: PromptTemplate::new(DEFAULT_PROMPT_TEMPLATE),
            stream_id: Some(DEFAULT_STREAM_ID.to_string()),
            min_visibility: 0.0,
            absolute_image_paths: false,
            fallback_fps: DEFAULT_FALLBACK_FPS,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            dataset_dir: std::env::var("ADT_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_dir),
            max_download: std::env::var("ADT_MAX_DOWNLOAD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_download),
            request_timeout: Duration::from_secs(
                std::env::var("ADT_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            sampling: std::env::var("ADT_SAMPLING")
                .ok()
                .and_then(|s| match s.parse() {
                    Ok(rate) => Some(rate),
                    Err(e) => {
                        warn!(value = %s, error = %e, "Ignoring invalid ADT_SAMPLING");
                        None
                    }
                })
                .unwrap_or(defaults.sampling),
            output_dir: std::env::var("ADT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            prompt_template: std::env::var("ADT_PROMPT_TEMPLATE")
                .map(PromptTemplate::new)
                .unwrap_or(defaults.prompt_template),
            stream_id: match std::env::var("ADT_STREAM_ID") {
                Ok(s) if s.trim().is_empty() => None,
                Ok(s) => Some(s.trim().to_string()),
                Err(_) => defaults.stream_id,
            },
            min_visibility: std::env::var("ADT_MIN_VISIBILITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_visibility),
            absolute_image_paths: std::env::var("ADT_ABSOLUTE_IMAGE_PATHS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.absolute_image_paths),
            fallback_fps: std::env::var("ADT_FALLBACK_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|fps: &f64| *fps > 0.0)
                .unwrap_or(defaults.fallback_fps),
        }
    }

    /// Reject settings no stage can run with. Environment values that fail
    /// to parse fall back to defaults in [`PipelineConfig::from_env`]; this
    /// catches parsed values that are out of range.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.request_timeout.is_zero() {
            return Err(PipelineError::config_error("request timeout must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(PipelineError::config_error(format!(
                "min_visibility must be within 0..=1, got {}",
                self.min_visibility
            )));
        }
        if !self.fallback_fps.is_finite() || self.fallback_fps <= 0.0 {
            return Err(PipelineError::config_error(format!(
                "fallback_fps must be positive, got {}",
                self.fallback_fps
            )));
        }
        Ok(())
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            timeout: self.request_timeout,
            ..Default::default()
        }
    }

    pub fn table_filter(&self) -> TableFilter {
        TableFilter {
            stream_id: self.stream_id.clone(),
            min_visibility: self.min_visibility,
        }
    }

    /// `{output_dir}/dataset.json`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(crate::builder::OUTPUT_FILE)
    }
}
