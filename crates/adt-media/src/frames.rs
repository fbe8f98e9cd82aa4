//! Frame extraction into contiguous `frame_XXXX.jpg` sequences.
//!
//! Numbering starts at 1 and never has gaps. When decoding stops early the
//! frames written so far are kept and the result is flagged as truncated;
//! only a source that cannot be opened at all is an error.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use adt_models::{FrameTimeline, FRAMES_TIMELINE_FILE};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};
use crate::sampling::SamplingRate;

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXT: &str = ".jpg";
const JPEG_QUALITY: u8 = 2;

/// File name of the frame with 1-based `index`.
pub fn frame_file_name(index: u32) -> String {
    format!("{}{:04}{}", FRAME_PREFIX, index, FRAME_EXT)
}

/// Parse the index out of a frame file name.
fn parse_frame_index(file_name: &str) -> Option<u32> {
    let digits = file_name.strip_prefix(FRAME_PREFIX)?.strip_suffix(FRAME_EXT)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|i| *i > 0)
}

/// An extracted frame on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    /// 1-based index
    pub index: u32,
    pub path: PathBuf,
}

impl FrameFile {
    pub fn file_name(&self) -> String {
        frame_file_name(self.index)
    }
}

/// Outcome of a frame extraction.
#[derive(Debug, Clone)]
pub struct ExtractionSummary {
    /// Frames actually written
    pub frames: usize,
    /// Frames a complete decode would have produced
    pub expected: usize,
    /// Decoding stopped before the end of the stream
    pub truncated: bool,
    pub timeline: FrameTimeline,
}

/// List the contiguous frame sequence in `dir`, ordered by index.
///
/// Frames after the first gap are not part of the sequence and are ignored.
pub async fn list_frames(dir: impl AsRef<Path>) -> MediaResult<Vec<FrameFile>> {
    let dir = dir.as_ref();
    let mut indices = Vec::new();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if let Some(index) = entry.file_name().to_str().and_then(parse_frame_index) {
            indices.push(index);
        }
    }
    indices.sort_unstable();

    let mut frames = Vec::with_capacity(indices.len());
    for (expected, index) in (1u32..).zip(indices.iter().copied()) {
        if index != expected {
            warn!(
                dir = %dir.display(),
                expected,
                found = index,
                "Gap in frame sequence, ignoring later frames"
            );
            break;
        }
        frames.push(FrameFile {
            index,
            path: dir.join(frame_file_name(index)),
        });
    }

    Ok(frames)
}

/// Read the timeline sidecar written next to extracted frames.
pub async fn read_timeline(frames_dir: impl AsRef<Path>) -> MediaResult<Option<FrameTimeline>> {
    let path = frames_dir.as_ref().join(FRAMES_TIMELINE_FILE);
    match fs::read(&path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Decode `video_path` into `output_dir/frame_XXXX.jpg` using `rate`.
///
/// Existing frame files in `output_dir` are removed first. A timeline
/// sidecar (`frames.json`) is written for the frames that were produced.
///
/// # Errors
///
/// `MediaError::ExtractionFailed` if the video cannot be opened or not a
/// single frame could be decoded. Tool-availability errors are returned
/// as-is.
pub async fn extract_frames(
    video_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    rate: SamplingRate,
) -> MediaResult<ExtractionSummary> {
    let video_path = video_path.as_ref();
    let output_dir = output_dir.as_ref();

    let info = match probe_video(video_path).await {
        Ok(info) => info,
        Err(e @ (MediaError::FfprobeNotFound | MediaError::Io(_))) => return Err(e),
        Err(e) => return Err(MediaError::extraction_failed(video_path, e.to_string())),
    };

    fs::create_dir_all(output_dir).await?;
    clear_frames(output_dir).await?;

    info!(
        video = %video_path.display(),
        sampling = %rate,
        duration = info.duration,
        fps = info.fps,
        "Extracting frames"
    );

    let decode_result = match rate {
        SamplingRate::Uniform(count) => extract_uniform(video_path, output_dir, &info, count).await,
        _ => extract_sequence(video_path, output_dir, &info, rate).await,
    };

    let frames = list_frames(output_dir).await?.len();
    let expected = rate.expected_frames(info.duration, info.fps);

    let truncated = match decode_result {
        Ok(()) => false,
        Err(e) if e.is_decode_failure() => {
            if frames == 0 {
                return Err(MediaError::extraction_failed(video_path, e.to_string()));
            }
            warn!(
                video = %video_path.display(),
                frames,
                expected,
                error = %e,
                "Decoding stopped early, keeping extracted frames"
            );
            true
        }
        Err(e) => return Err(e),
    };

    if frames == 0 {
        return Err(MediaError::extraction_failed(video_path, "no frames decoded"));
    }

    let timeline = FrameTimeline {
        sampling: rate.to_string(),
        source_fps: info.fps,
        duration_secs: info.duration,
        timestamps_secs: (0..frames)
            .map(|i| rate.frame_timestamp(i, info.duration, info.fps))
            .collect(),
        truncated,
    };
    write_timeline(output_dir, &timeline).await?;

    metrics::counter!("adt_frames_extracted_total").increment(frames as u64);
    info!(
        video = %video_path.display(),
        frames,
        expected,
        truncated,
        "Frame extraction finished"
    );

    Ok(ExtractionSummary {
        frames,
        expected,
        truncated,
        timeline,
    })
}

/// Decode the whole stream once, writing an image sequence.
async fn extract_sequence(
    video_path: &Path,
    output_dir: &Path,
    info: &VideoInfo,
    rate: SamplingRate,
) -> MediaResult<()> {
    let pattern = output_dir.join(format!("{}%04d{}", FRAME_PREFIX, FRAME_EXT));

    let mut cmd = FfmpegCommand::new(video_path, &pattern);
    if let Some(filter) = rate.video_filter() {
        cmd = cmd.video_filter(filter);
    }
    let cmd = cmd
        .passthrough_timestamps()
        .jpeg_quality(JPEG_QUALITY)
        .start_number(1)
        .no_audio();

    let total_ms = (info.duration * 1000.0) as i64;
    FfmpegRunner::new()
        .run_with_progress(&cmd, move |p| {
            debug!(
                frame = p.frame,
                percent = p.percentage(total_ms),
                "Extraction progress"
            );
        })
        .await
}

/// Seek to the centre of each of `count` equal slots and grab one frame.
/// Stops at the first failure so the sequence stays gapless.
async fn extract_uniform(
    video_path: &Path,
    output_dir: &Path,
    info: &VideoInfo,
    count: u32,
) -> MediaResult<()> {
    let runner = FfmpegRunner::new();
    let rate = SamplingRate::Uniform(count);

    for i in 0..count {
        let ts = rate.frame_timestamp(i as usize, info.duration, info.fps);
        let index = i + 1;
        let frame_path = output_dir.join(frame_file_name(index));

        let cmd = FfmpegCommand::new(video_path, &frame_path)
            .seek(ts)
            .single_frame()
            .jpeg_quality(JPEG_QUALITY)
            .no_audio();
        runner.run(&cmd).await?;

        // FFmpeg exits cleanly without output when seeking past the end
        if !frame_path.exists() {
            return Err(MediaError::ffmpeg_failed(
                format!("no frame decoded at {:.3}s", ts),
                None,
                None,
            ));
        }
    }

    Ok(())
}

async fn clear_frames(dir: &Path) -> MediaResult<()> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if parse_frame_index(name).is_some() || name == FRAMES_TIMELINE_FILE {
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

async fn write_timeline(dir: &Path, timeline: &FrameTimeline) -> MediaResult<()> {
    let json = serde_json::to_vec_pretty(timeline)?;
    fs::write(dir.join(FRAMES_TIMELINE_FILE), json).await?;
    Ok(())
}
