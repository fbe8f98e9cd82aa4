//! Per-recording outcomes and end-of-run summaries.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use adt_fetch::FetchReport;
use adt_models::RecordingId;
use tracing::{info, warn};

/// Frame extraction result for one fetched recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// Frames were extracted in this run
    Extracted {
        frames: usize,
        expected: usize,
        truncated: bool,
    },
    /// A complete frame sequence and timeline were already on disk
    AlreadyExtracted { frames: usize },
    /// No video was fetched for the recording
    NoVideo,
    /// The video could not be decoded; the recording has zero frames
    Failed(String),
}

impl ExtractionStatus {
    pub fn frame_count(&self) -> usize {
        match self {
            ExtractionStatus::Extracted { frames, .. } | ExtractionStatus::AlreadyExtracted { frames } => {
                *frames
            }
            ExtractionStatus::NoVideo | ExtractionStatus::Failed(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordingExtraction {
    pub recording_id: RecordingId,
    pub status: ExtractionStatus,
}

/// Result of the fetch stage.
#[derive(Debug, Clone, Default)]
pub struct FetchStageReport {
    /// Manifest entries skipped while parsing
    pub skipped_entries: usize,
    pub fetch: FetchReport,
    pub extractions: Vec<RecordingExtraction>,
}

impl FetchStageReport {
    /// Frames written during this run.
    pub fn frames_extracted(&self) -> usize {
        self.extractions
            .iter()
            .filter_map(|e| match e.status {
                ExtractionStatus::Extracted { frames, .. } => Some(frames),
                _ => None,
            })
            .sum()
    }

    pub fn extraction_failures(&self) -> usize {
        self.extractions
            .iter()
            .filter(|e| matches!(e.status, ExtractionStatus::Failed(_)))
            .count()
    }

    /// At least one recording was fully fetched.
    pub fn is_success(&self) -> bool {
        self.fetch.is_success()
    }

    pub fn log_summary(&self) {
        info!(
            selected = self.fetch.recordings.len(),
            fully_fetched = self.fetch.complete_count(),
            incomplete = self.fetch.failed_count(),
            not_selected = self.fetch.not_selected,
            skipped_entries = self.skipped_entries,
            frames_extracted = self.frames_extracted(),
            extraction_failures = self.extraction_failures(),
            "Fetch stage finished"
        );

        for recording in &self.fetch.recordings {
            if let adt_fetch::FetchStatus::Incomplete { failures } = &recording.status {
                let assets: Vec<String> = failures.iter().map(|f| f.kind.to_string()).collect();
                warn!(
                    recording_id = %recording.recording_id(),
                    failed_assets = %assets.join(", "),
                    "Recording not fully fetched"
                );
            }
        }
    }
}

/// Why a recording contributes no records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// No extracted frames on disk
    NoFrames,
    /// Frames could not be read
    Frames(String),
    /// Ground truth missing or inconsistent
    Annotations(String),
}

impl ExclusionReason {
    /// Short label used for grouping in the summary.
    pub fn label(&self) -> &'static str {
        match self {
            ExclusionReason::NoFrames => "no_frames",
            ExclusionReason::Frames(_) => "frames_unreadable",
            ExclusionReason::Annotations(_) => "annotations",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NoFrames => write!(f, "no extracted frames"),
            ExclusionReason::Frames(e) => write!(f, "frames unreadable: {}", e),
            ExclusionReason::Annotations(e) => write!(f, "annotations: {}", e),
        }
    }
}

/// Prepare-stage outcome for one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingOutcome {
    Included { records: usize },
    Excluded(ExclusionReason),
}

#[derive(Debug, Clone)]
pub struct RecordingResult {
    pub recording_id: RecordingId,
    pub outcome: RecordingOutcome,
}

/// Result of the prepare stage.
#[derive(Debug, Clone, Default)]
pub struct PrepareReport {
    /// Recordings in processing order
    pub recordings: Vec<RecordingResult>,
    pub records_written: usize,
    pub output_path: PathBuf,
}

impl PrepareReport {
    pub fn included_count(&self) -> usize {
        self.recordings
            .iter()
            .filter(|r| matches!(r.outcome, RecordingOutcome::Included { .. }))
            .count()
    }

    pub fn excluded(&self) -> impl Iterator<Item = (&RecordingId, &ExclusionReason)> {
        self.recordings.iter().filter_map(|r| match &r.outcome {
            RecordingOutcome::Excluded(reason) => Some((&r.recording_id, reason)),
            RecordingOutcome::Included { .. } => None,
        })
    }

    /// Excluded recordings counted per reason label.
    pub fn exclusion_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, reason) in self.excluded() {
            *counts.entry(reason.label()).or_insert(0) += 1;
        }
        counts
    }

    pub fn log_summary(&self) {
        let excluded: usize = self.exclusion_counts().values().sum();
        info!(
            recordings = self.recordings.len(),
            included = self.included_count(),
            excluded,
            records = self.records_written,
            output = %self.output_path.display(),
            "Prepare stage finished"
        );

        for (recording_id, reason) in self.excluded() {
            warn!(
                recording_id = %recording_id,
                reason = reason.label(),
                "Excluded from dataset: {}", reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, outcome: RecordingOutcome) -> RecordingResult {
        RecordingResult {
            recording_id: RecordingId::from(id),
            outcome,
        }
    }

    #[test]
    fn test_prepare_report_counts() {
        let report = PrepareReport {
            recordings: vec![
                result("a", RecordingOutcome::Included { records: 3 }),
                result(
                    "b",
                    RecordingOutcome::Excluded(ExclusionReason::Annotations(
                        "instances.json not found".to_string(),
                    )),
                ),
                result("c", RecordingOutcome::Excluded(ExclusionReason::NoFrames)),
                result("d", RecordingOutcome::Excluded(ExclusionReason::NoFrames)),
            ],
            records_written: 3,
            output_path: PathBuf::from("prepared_dataset/dataset.json"),
        };

        assert_eq!(report.included_count(), 1);
        let counts = report.exclusion_counts();
        assert_eq!(counts["no_frames"], 2);
        assert_eq!(counts["annotations"], 1);
    }

    #[test]
    fn test_frames_extracted_counts_this_run_only() {
        let report = FetchStageReport {
            extractions: vec![
                RecordingExtraction {
                    recording_id: RecordingId::from("a"),
                    status: ExtractionStatus::Extracted {
                        frames: 8,
                        expected: 8,
                        truncated: false,
                    },
                },
                RecordingExtraction {
                    recording_id: RecordingId::from("b"),
                    status: ExtractionStatus::AlreadyExtracted { frames: 30 },
                },
                RecordingExtraction {
                    recording_id: RecordingId::from("c"),
                    status: ExtractionStatus::Failed("moov atom not found".to_string()),
                },
            ],
            ..Default::default()
        };

        assert_eq!(report.frames_extracted(), 8);
        assert_eq!(report.extraction_failures(), 1);
        assert_eq!(report.extractions[1].status.frame_count(), 30);
    }
}
