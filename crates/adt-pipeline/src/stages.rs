//! The two independently invokable pipeline stages.
//!
//! The fetch stage reads the manifest, downloads bundles and extracts
//! frames. The prepare stage normalizes annotations and writes the
//! training records. The dataset directory is the only hand-off between
//! them.

use std::path::Path;

use adt_fetch::{BundleFetcher, Downloader, RecordingFetch};
use adt_media::{check_ffmpeg, extract_frames, list_frames, read_timeline, SamplingRate};
use adt_models::read_manifest;
use tracing::{info, warn, Instrument};

use crate::builder::{build_records, write_records, BuildOptions};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::RecordingLogger;
use crate::report::{ExtractionStatus, FetchStageReport, PrepareReport, RecordingExtraction};

/// Fetch up to `max_download` recordings from the manifest at
/// `manifest_path`, extracting each recording's frames right after it is
/// fetched.
///
/// Fails only when the config is out of range, the manifest is malformed or
/// `dataset_dir` cannot be created. Per-recording failures are reported.
pub async fn run_fetch_stage(config: &PipelineConfig, manifest_path: &Path) -> PipelineResult<FetchStageReport> {
    config.validate()?;
    let manifest = read_manifest(manifest_path)?;
    info!(
        manifest = %manifest_path.display(),
        recordings = manifest.len(),
        skipped = manifest.skipped.len(),
        "Loaded manifest"
    );

    let fetcher = BundleFetcher::new(Downloader::new(config.downloader_config())?);
    let (selected, mut fetch) = fetcher
        .select(&manifest, &config.dataset_dir, config.max_download)
        .await?;

    if let Err(e) = check_ffmpeg() {
        warn!(error = %e, "Frame extraction will fail for every recording");
    }

    let mut extractions = Vec::with_capacity(selected.len());
    for entry in selected {
        let recording = fetcher.fetch_entry(entry, &config.dataset_dir).await;

        let logger = RecordingLogger::new(recording.recording_id(), "extract");
        let status = extract_recording(&recording, config.sampling, &logger)
            .instrument(logger.create_span())
            .await;
        extractions.push(RecordingExtraction {
            recording_id: recording.recording_id().clone(),
            status,
        });
        fetch.recordings.push(recording);
    }

    Ok(FetchStageReport {
        skipped_entries: manifest.skipped.len(),
        fetch,
        extractions,
    })
}

async fn extract_recording(
    recording: &RecordingFetch,
    sampling: SamplingRate,
    logger: &RecordingLogger,
) -> ExtractionStatus {
    let layout = &recording.layout;
    let video = layout.video_path();
    if !video.exists() {
        logger.log_warning("no video on disk, skipping frame extraction");
        return ExtractionStatus::NoVideo;
    }

    if let Some(frames) = existing_frames(&layout.frames_dir(), sampling).await {
        info!(
            recording_id = %layout.recording_id(),
            frames,
            "Frames already extracted, skipping"
        );
        return ExtractionStatus::AlreadyExtracted { frames };
    }

    logger.log_start(&format!("extracting frames ({})", sampling));
    match extract_frames(&video, layout.frames_dir(), sampling).await {
        Ok(summary) => {
            if summary.truncated {
                logger.log_warning(&format!(
                    "decoding stopped early, kept {} of {} expected frames",
                    summary.frames, summary.expected
                ));
            } else {
                logger.log_completion(&format!("{} frames extracted", summary.frames));
            }
            ExtractionStatus::Extracted {
                frames: summary.frames,
                expected: summary.expected,
                truncated: summary.truncated,
            }
        }
        Err(e) => {
            logger.log_error(&e.to_string());
            ExtractionStatus::Failed(e.to_string())
        }
    }
}

/// Frame count of a previous, complete extraction with the same sampling,
/// if its timeline matches the frames on disk. Truncated extractions are
/// redone.
async fn existing_frames(frames_dir: &Path, sampling: SamplingRate) -> Option<usize> {
    let timeline = read_timeline(frames_dir).await.ok().flatten()?;
    if timeline.truncated || timeline.sampling != sampling.to_string() {
        return None;
    }
    let frames = list_frames(frames_dir).await.ok()?;
    (!frames.is_empty() && frames.len() == timeline.len()).then_some(frames.len())
}

/// Build training records from everything under `dataset_dir` and write
/// them to `{output_dir}/dataset.json`.
///
/// Fails only when the config is out of range, `dataset_dir` cannot be
/// read or the output cannot be written.
pub async fn run_prepare_stage(config: &PipelineConfig) -> PipelineResult<PrepareReport> {
    config.validate()?;
    info!(
        dataset_dir = %config.dataset_dir.display(),
        output_dir = %config.output_dir.display(),
        "Preparing dataset"
    );

    let output = build_records(
        &config.dataset_dir,
        &config.prompt_template,
        &BuildOptions::from(config),
    )
    .await?;

    let output_path = write_records(&output.records, &config.output_dir).await?;

    Ok(PrepareReport {
        recordings: output.recordings,
        records_written: output.records.len(),
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_models::{FrameTimeline, RecordingId, RecordingLayout};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_existing_frames_requires_matching_sampling() {
        let dir = TempDir::new().unwrap();
        for i in 1..=2 {
            std::fs::write(dir.path().join(format!("frame_{:04}.jpg", i)), b"jpg").unwrap();
        }
        let timeline = FrameTimeline::uniform("every:5", 30.0, 1.0, 2, 1.0 / 6.0);
        std::fs::write(dir.path().join("frames.json"), serde_json::to_vec(&timeline).unwrap()).unwrap();

        assert_eq!(existing_frames(dir.path(), SamplingRate::EveryNth(5)).await, Some(2));
        assert_eq!(existing_frames(dir.path(), SamplingRate::EveryFrame).await, None);
    }

    #[tokio::test]
    async fn test_truncated_extraction_is_redone() {
        let dir = TempDir::new().unwrap();
        for i in 1..=2 {
            std::fs::write(dir.path().join(format!("frame_{:04}.jpg", i)), b"jpg").unwrap();
        }
        let mut timeline = FrameTimeline::uniform("every:5", 30.0, 1.0, 2, 1.0 / 6.0);
        timeline.truncated = true;
        std::fs::write(dir.path().join("frames.json"), serde_json::to_vec(&timeline).unwrap()).unwrap();

        assert_eq!(existing_frames(dir.path(), SamplingRate::EveryNth(5)).await, None);
    }

    #[tokio::test]
    async fn test_extract_recording_without_video() {
        let dir = TempDir::new().unwrap();
        let recording = RecordingFetch {
            layout: RecordingLayout::new(dir.path(), RecordingId::from("seq")),
            status: adt_fetch::FetchStatus::Incomplete { failures: vec![] },
        };
        let logger = RecordingLogger::new(recording.recording_id(), "extract");

        let status = extract_recording(&recording, SamplingRate::EveryFrame, &logger).await;
        assert_eq!(status, ExtractionStatus::NoVideo);
    }

    #[tokio::test]
    async fn test_unreadable_video_fails_recording() {
        let dir = TempDir::new().unwrap();
        let layout = RecordingLayout::new(dir.path(), RecordingId::from("seq"));
        std::fs::create_dir_all(layout.frames_dir()).unwrap();
        std::fs::write(layout.video_path(), b"not a video").unwrap();
        let recording = RecordingFetch {
            layout,
            status: adt_fetch::FetchStatus::Complete { downloaded: 1 },
        };
        let logger = RecordingLogger::new(recording.recording_id(), "extract");

        let status = extract_recording(&recording, SamplingRate::EveryFrame, &logger).await;
        assert!(matches!(status, ExtractionStatus::Failed(_)));
        assert_eq!(status.frame_count(), 0);
    }
}
