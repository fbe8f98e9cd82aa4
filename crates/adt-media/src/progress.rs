//! FFmpeg progress parsing.

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Decoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether FFmpeg reported the end of the stream
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

/// Parse a line from FFmpeg's `-progress` output into `current`.
///
/// Returns a snapshot when a `progress=` line closes a block, `None` for
/// every other line.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_ms" | "out_time_us" => {
            // Despite the name, FFmpeg reports out_time_ms in microseconds.
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub(crate) fn is_progress_line(line: &str) -> bool {
    const KEYS: [&str; 12] = [
        "frame", "fps", "stream_0_0_q", "bitrate", "total_size", "out_time_us",
        "out_time_ms", "out_time", "dup_frames", "drop_frames", "speed", "progress",
    ];
    line.split_once('=')
        .map(|(key, _)| KEYS.contains(&key.trim()))
        .unwrap_or(false)
}
