//! Tracing setup and per-recording structured logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adt_models::RecordingId;

/// Initialize tracing: colored output by default, JSON when
/// `LOG_FORMAT=json`. `RUST_LOG` directives are honored.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["adt=info", "hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logger attaching the recording id and stage to every event.
#[derive(Debug, Clone)]
pub struct RecordingLogger {
    recording_id: String,
    stage: String,
}

impl RecordingLogger {
    /// # Arguments
    /// * `recording_id` - Recording being processed
    /// * `stage` - Pipeline step (e.g. "extract", "prepare")
    pub fn new(recording_id: &RecordingId, stage: &str) -> Self {
        Self {
            recording_id: recording_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            recording_id = %self.recording_id,
            stage = %self.stage,
            "Recording started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            recording_id = %self.recording_id,
            stage = %self.stage,
            "Recording warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            recording_id = %self.recording_id,
            stage = %self.stage,
            "Recording error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            recording_id = %self.recording_id,
            stage = %self.stage,
            "Recording completed: {}", message
        );
    }

    pub fn recording_id(&self) -> &str {
        &self.recording_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span carrying the recording id, for instrumenting nested calls.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "recording",
            recording_id = %self.recording_id,
            stage = %self.stage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger() {
        let logger = RecordingLogger::new(&RecordingId::from("seq_1"), "extract");
        assert_eq!(logger.recording_id(), "seq_1");
        assert_eq!(logger.stage(), "extract");
    }
}
