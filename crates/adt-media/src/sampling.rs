//! Frame sampling modes.

use std::fmt;
use std::str::FromStr;

use crate::error::MediaError;

/// How frames are sampled from a video.
///
/// Text form (CLI / env): `all`, `every:N`, `fps:F`, `uniform:N`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SamplingRate {
    /// Every decoded frame
    #[default]
    EveryFrame,
    /// Every Nth decoded frame, starting with the first
    EveryNth(u32),
    /// Target output frame rate
    Fps(f64),
    /// N frames spread uniformly over the video, each taken at the centre
    /// of its slot
    Uniform(u32),
}

impl SamplingRate {
    /// Output frames per second for a source running at `source_fps`.
    /// `None` for uniform sampling, which is not rate based.
    pub fn output_fps(&self, source_fps: f64) -> Option<f64> {
        match *self {
            SamplingRate::EveryFrame => Some(source_fps),
            SamplingRate::EveryNth(n) => Some(source_fps / n as f64),
            SamplingRate::Fps(fps) => Some(fps),
            SamplingRate::Uniform(_) => None,
        }
    }

    /// Number of frames a complete extraction produces:
    /// `floor(duration × rate)` for rate-based modes.
    pub fn expected_frames(&self, duration_secs: f64, source_fps: f64) -> usize {
        match *self {
            SamplingRate::Uniform(n) => n as usize,
            _ => self
                .output_fps(source_fps)
                .map(|fps| (duration_secs * fps).max(0.0).floor() as usize)
                .unwrap_or(0),
        }
    }

    /// Timestamp in seconds of the frame at 0-based position `i`.
    pub fn frame_timestamp(&self, i: usize, duration_secs: f64, source_fps: f64) -> f64 {
        match *self {
            SamplingRate::Uniform(n) => duration_secs * (i as f64 + 0.5) / n as f64,
            _ => match self.output_fps(source_fps) {
                Some(fps) if fps > 0.0 => i as f64 / fps,
                _ => 0.0,
            },
        }
    }

    /// Video filter implementing the mode, if one is needed.
    pub fn video_filter(&self) -> Option<String> {
        match *self {
            SamplingRate::EveryFrame | SamplingRate::Uniform(_) => None,
            SamplingRate::EveryNth(1) => None,
            SamplingRate::EveryNth(n) => Some(format!("select=not(mod(n\\,{}))", n)),
            SamplingRate::Fps(fps) => Some(format!("fps={}", fps)),
        }
    }
}

impl fmt::Display for SamplingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingRate::EveryFrame => write!(f, "all"),
            SamplingRate::EveryNth(n) => write!(f, "every:{}", n),
            SamplingRate::Fps(fps) => write!(f, "fps:{}", fps),
            SamplingRate::Uniform(n) => write!(f, "uniform:{}", n),
        }
    }
}

impl FromStr for SamplingRate {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "all" || s == "every_frame" {
            return Ok(SamplingRate::EveryFrame);
        }

        let invalid = || MediaError::InvalidSampling(s.clone());
        let (mode, value) = s.split_once(':').ok_or_else(invalid)?;

        match mode {
            "every" => match value.parse::<u32>() {
                Ok(n) if n > 0 => Ok(SamplingRate::EveryNth(n)),
                _ => Err(invalid()),
            },
            "fps" => match value.parse::<f64>() {
                Ok(fps) if fps.is_finite() && fps > 0.0 => Ok(SamplingRate::Fps(fps)),
                _ => Err(invalid()),
            },
            "uniform" => match value.parse::<u32>() {
                Ok(n) if n > 0 => Ok(SamplingRate::Uniform(n)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}
