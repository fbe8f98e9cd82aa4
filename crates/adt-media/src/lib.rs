//! Frame extraction for ADT recordings.
//!
//! Shells out to `ffmpeg`/`ffprobe` and writes each recording's frames as a
//! contiguous `frame_XXXX.jpg` sequence plus a `frames.json` timeline.

pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod progress;
pub mod sampling;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{
    extract_frames, frame_file_name, list_frames, read_timeline, ExtractionSummary, FrameFile,
};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use sampling::SamplingRate;
