//! Frame timeline sidecar (`frames/frames.json`).

use serde::{Deserialize, Serialize};

/// Timestamps of extracted frames relative to the start of the video.
///
/// Written by the frame extractor, read by the prepare stage to align
/// annotation rows with frames. Frame indices are 1-based to match the
/// `frame_0001.jpg` file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTimeline {
    /// Sampling mode the frames were produced with (e.g. `every:5`)
    pub sampling: String,
    /// Frame rate of the source video
    pub source_fps: f64,
    /// Duration of the source video in seconds
    pub duration_secs: f64,
    /// Timestamp in seconds of frame `i + 1`
    pub timestamps_secs: Vec<f64>,
    /// Decoding stopped before the sampling was exhausted
    #[serde(default)]
    pub truncated: bool,
}

impl FrameTimeline {
    /// Timeline with frames spaced `interval_secs` apart starting at zero.
    pub fn uniform(
        sampling: impl Into<String>,
        source_fps: f64,
        duration_secs: f64,
        frame_count: usize,
        interval_secs: f64,
    ) -> Self {
        Self {
            sampling: sampling.into(),
            source_fps,
            duration_secs,
            timestamps_secs: (0..frame_count).map(|i| i as f64 * interval_secs).collect(),
            truncated: false,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps_secs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_secs.is_empty()
    }

    /// Timestamp of a 1-based frame index in nanoseconds.
    pub fn timestamp_ns(&self, frame_index: u32) -> Option<i64> {
        let idx = (frame_index as usize).checked_sub(1)?;
        self.timestamps_secs
            .get(idx)
            .map(|secs| (secs * 1_000_000_000.0).round() as i64)
    }

    /// Keep only the first `frame_count` frames.
    pub fn truncate(&mut self, frame_count: usize) {
        self.timestamps_secs.truncate(frame_count);
    }
}
