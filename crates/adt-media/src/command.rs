//! Building and running `ffmpeg` invocations for frame decoding.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Diagnostic stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `ffmpeg` call decoding `input` into an image file or an
/// image-sequence pattern.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Placed before `-i`
    pre_input: Vec<String>,
    /// Placed between `-i` and the output
    post_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            pre_input: Vec::new(),
            post_input: Vec::new(),
        }
    }

    fn pre(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.pre_input.push(flag.to_string());
        self.pre_input.push(value.into());
        self
    }

    fn post(mut self, flag: &str, value: Option<String>) -> Self {
        self.post_input.push(flag.to_string());
        self.post_input.extend(value);
        self
    }

    /// Input-side seek, in seconds.
    pub fn seek(self, seconds: f64) -> Self {
        self.pre("-ss", format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.post("-vf", Some(filter.into()))
    }

    /// Emit decoded frames as-is, no duplication or dropping.
    pub fn passthrough_timestamps(self) -> Self {
        self.post("-vsync", Some("passthrough".to_string()))
    }

    /// JPEG quality scale, 2 (best) to 31.
    pub fn jpeg_quality(self, q: u8) -> Self {
        self.post("-q:v", Some(q.to_string()))
    }

    /// First index used by an image-sequence pattern.
    pub fn start_number(self, n: u32) -> Self {
        self.post("-start_number", Some(n.to_string()))
    }

    pub fn no_audio(self) -> Self {
        self.post("-an", None)
    }

    pub fn single_frame(self) -> Self {
        self.post("-frames:v", Some("1".to_string()))
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2", "-nostats"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.pre_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.post_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Spawns `ffmpeg`, streams its progress and keeps the tail of its
/// diagnostics for failures.
#[derive(Debug, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, calling `on_progress` for every completed progress block.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!(args = %args.join(" "), "Spawning ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr was not piped"))?;
        let mut lines = BufReader::new(stderr).lines();

        let reader = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = lines.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = parse_progress_line(&line, &mut current) {
                        on_progress(snapshot);
                    }
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            Vec::from(tail).join("\n")
        });

        let status = child.wait().await?;
        let diagnostics = reader.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }
        Err(MediaError::ffmpeg_failed(
            "ffmpeg exited with non-zero status",
            (!diagnostics.is_empty()).then_some(diagnostics),
            status.code(),
        ))
    }
}

/// Locate `ffmpeg` on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Locate `ffprobe` on `PATH`.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
