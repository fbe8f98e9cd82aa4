//! Record Builder: joins extracted frames with per-frame dynamic objects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use adt_annotations::{normalize_recording, TableFilter};
use adt_media::{list_frames, read_timeline, FrameFile};
use adt_models::{parse_activity_label, FrameTimeline, RecordingId, RecordingLayout, TrainingRecord};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, DEFAULT_FALLBACK_FPS};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RecordingLogger;
use crate::prompt::PromptTemplate;
use crate::report::{ExclusionReason, RecordingOutcome, RecordingResult};

/// File name of the prepared dataset inside the output directory.
pub const OUTPUT_FILE: &str = "dataset.json";

/// Optional per-recording activity labels, `{recording_id: label}`.
const ACTION_LABELS_FILE: &str = "action_labels.json";

/// Knobs for [`build_records`] beyond the dataset root and template.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub filter: TableFilter,
    pub absolute_image_paths: bool,
    pub fallback_fps: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            filter: TableFilter::default(),
            absolute_image_paths: false,
            fallback_fps: DEFAULT_FALLBACK_FPS,
        }
    }
}

impl From<&PipelineConfig> for BuildOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            filter: config.table_filter(),
            absolute_image_paths: config.absolute_image_paths,
            fallback_fps: config.fallback_fps,
        }
    }
}

/// Records plus the per-recording outcomes that produced them.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub records: Vec<TrainingRecord>,
    pub recordings: Vec<RecordingResult>,
}

/// Build training records for every recording under `dataset_dir`.
///
/// Recordings are visited in ascending id order and frames in ascending
/// index. A recording without frames or with missing or inconsistent
/// ground truth is excluded and reported; it never fails the build. Only
/// an unreadable `dataset_dir` is an error.
pub async fn build_records(
    dataset_dir: &Path,
    template: &PromptTemplate,
    options: &BuildOptions,
) -> PipelineResult<BuildOutput> {
    let mut output = BuildOutput::default();

    for recording_id in discover_recordings(dataset_dir).await? {
        let layout = RecordingLayout::new(dataset_dir, recording_id.clone());
        let outcome = match build_recording(&layout, template, options).await {
            Ok(records) => {
                let count = records.len();
                output.records.extend(records);
                RecordingOutcome::Included { records: count }
            }
            Err(reason) => {
                metrics::counter!("adt_recordings_excluded_total", "reason" => reason.label()).increment(1);
                RecordingOutcome::Excluded(reason)
            }
        };
        output.recordings.push(RecordingResult { recording_id, outcome });
    }

    Ok(output)
}

/// Write `records` as one JSON array to `{output_dir}/dataset.json`,
/// replacing any previous output atomically.
pub async fn write_records(records: &[TrainingRecord], output_dir: &Path) -> PipelineResult<PathBuf> {
    let output_path = output_dir.join(OUTPUT_FILE);
    let tmp_path = output_dir.join(format!(".{}.tmp", OUTPUT_FILE));

    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| PipelineError::output_write(output_dir, e))?;

    let json = serde_json::to_vec_pretty(records)?;
    fs::write(&tmp_path, &json)
        .await
        .map_err(|e| PipelineError::output_write(&tmp_path, e))?;
    fs::rename(&tmp_path, &output_path)
        .await
        .map_err(|e| PipelineError::output_write(&output_path, e))?;

    metrics::counter!("adt_records_written_total").increment(records.len() as u64);
    info!(
        path = %output_path.display(),
        records = records.len(),
        bytes = json.len(),
        "Wrote prepared dataset"
    );

    Ok(output_path)
}

/// Recording directories under `dataset_dir`, sorted by id.
///
/// A recording directory is any subdirectory holding `frames/` or
/// `annotations/`; other entries are ignored.
async fn discover_recordings(dataset_dir: &Path) -> PipelineResult<Vec<RecordingId>> {
    let mut entries = fs::read_dir(dataset_dir).await?;
    let mut ids = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "Skipping non UTF-8 directory name");
            continue;
        };
        let layout = RecordingLayout::new(dataset_dir, RecordingId::from(name.as_str()));
        if layout.frames_dir().is_dir() || layout.annotations_dir().is_dir() {
            ids.push(RecordingId::from(name));
        } else {
            debug!(dir = %name, "Not a recording directory");
        }
    }

    ids.sort();
    Ok(ids)
}

async fn build_recording(
    layout: &RecordingLayout,
    template: &PromptTemplate,
    options: &BuildOptions,
) -> Result<Vec<TrainingRecord>, ExclusionReason> {
    let logger = RecordingLogger::new(layout.recording_id(), "prepare");

    let mut frames = list_frames(layout.frames_dir())
        .await
        .map_err(|e| ExclusionReason::Frames(e.to_string()))?;
    if frames.is_empty() {
        logger.log_warning("no extracted frames");
        return Err(ExclusionReason::NoFrames);
    }

    let timeline = load_timeline(layout, &mut frames, options.fallback_fps, &logger).await?;

    let presence = normalize_recording(layout, &timeline, &options.filter)
        .await
        .map_err(|e| {
            logger.log_warning(&format!("excluded, {}", e));
            ExclusionReason::Annotations(e.to_string())
        })?;

    let activity = match load_action_label(layout).await {
        Some(label) => label,
        None => parse_activity_label(layout.recording_id().as_str()),
    };

    let records: Vec<TrainingRecord> = frames
        .iter()
        .map(|frame| {
            let dynamic_objects = presence.dynamic_names(frame.index);
            TrainingRecord {
                image: image_path(layout, frame, options.absolute_image_paths),
                prompt: template.render(&dynamic_objects, &activity),
                dynamic_objects,
            }
        })
        .collect();

    logger.log_completion(&format!(
        "{} records, {} with dynamic objects, activity {}",
        records.len(),
        presence.frames_with_dynamic_objects(),
        activity
    ));

    Ok(records)
}

/// Read the timeline sidecar, falling back to a uniform timeline at
/// `fallback_fps`. Frames and timeline are trimmed to their common length.
async fn load_timeline(
    layout: &RecordingLayout,
    frames: &mut Vec<FrameFile>,
    fallback_fps: f64,
    logger: &RecordingLogger,
) -> Result<FrameTimeline, ExclusionReason> {
    let timeline = read_timeline(layout.frames_dir())
        .await
        .map_err(|e| ExclusionReason::Frames(format!("invalid frame timeline: {}", e)))?;

    let mut timeline = match timeline {
        Some(timeline) => timeline,
        None => {
            logger.log_warning(&format!(
                "no frame timeline, assuming {} fps",
                fallback_fps
            ));
            let interval = 1.0 / fallback_fps;
            FrameTimeline::uniform(
                "unknown",
                fallback_fps,
                frames.len() as f64 * interval,
                frames.len(),
                interval,
            )
        }
    };

    if timeline.len() != frames.len() {
        logger.log_warning(&format!(
            "timeline covers {} frames, {} on disk",
            timeline.len(),
            frames.len()
        ));
        let common = timeline.len().min(frames.len());
        frames.truncate(common);
        timeline.truncate(common);
    }

    if frames.is_empty() {
        return Err(ExclusionReason::NoFrames);
    }

    Ok(timeline)
}

async fn load_action_label(layout: &RecordingLayout) -> Option<String> {
    let path = layout.annotations_dir().join(ACTION_LABELS_FILE);
    let bytes = fs::read(&path).await.ok()?;

    match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
        Ok(labels) => labels
            .get(layout.recording_id().as_str())
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed action labels");
            None
        }
    }
}

fn image_path(layout: &RecordingLayout, frame: &FrameFile, absolute: bool) -> String {
    if absolute {
        let path = std::path::absolute(&frame.path).unwrap_or_else(|_| frame.path.clone());
        path.to_string_lossy().into_owned()
    } else {
        layout.relative_frame_path(&frame.file_name())
    }
}
