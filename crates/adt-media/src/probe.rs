//! Reading duration and frame rate from a video with `ffprobe`.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container does not report one. ADT RGB
/// streams are recorded at 30 fps.
pub const DEFAULT_FPS: f64 = 30.0;

/// What frame sampling needs to know about a video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Seconds; 0 when neither container nor stream reports it
    pub duration: f64,
    pub fps: f64,
    /// `nb_frames` of the video stream, when present
    pub frame_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Probe `path` for its first video stream.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::VideoNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ProbeFailed {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(path, &output.stdout)
}

fn parse_probe_output(path: &Path, stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::NoVideoStream(path.to_path_buf()))?;

    // Container duration wins over the stream's
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(DEFAULT_FPS);

    Ok(VideoInfo {
        duration,
        fps,
        frame_count: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
    })
}

/// `"30/1"` or `"29.97"`. Zero or undefined rates give `None`.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
