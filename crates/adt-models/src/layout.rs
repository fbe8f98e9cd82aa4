//! On-disk layout of a recording directory.
//!
//! ```text
//! {dataset_dir}/{recording_id}/video.mp4
//! {dataset_dir}/{recording_id}/frames/frame_0001.jpg
//! {dataset_dir}/{recording_id}/frames/frames.json
//! {dataset_dir}/{recording_id}/annotations/instances.json
//! ```

use std::path::{Path, PathBuf};

use crate::asset::AssetKind;
use crate::recording::RecordingId;

/// File name of the downloaded video inside the recording directory.
pub const VIDEO_FILE: &str = "video.mp4";

/// Frame timeline sidecar written next to the extracted frames.
pub const FRAMES_TIMELINE_FILE: &str = "frames.json";

const FRAMES_DIR: &str = "frames";
const ANNOTATIONS_DIR: &str = "annotations";

/// Paths of a single recording under a dataset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLayout {
    dataset_dir: PathBuf,
    recording_id: RecordingId,
}

impl RecordingLayout {
    pub fn new(dataset_dir: impl AsRef<Path>, recording_id: RecordingId) -> Self {
        Self {
            dataset_dir: dataset_dir.as_ref().to_path_buf(),
            recording_id,
        }
    }

    pub fn recording_id(&self) -> &RecordingId {
        &self.recording_id
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }

    /// `{dataset_dir}/{recording_id}`
    pub fn root(&self) -> PathBuf {
        self.dataset_dir.join(self.recording_id.as_str())
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root().join(FRAMES_DIR)
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.root().join(ANNOTATIONS_DIR)
    }

    pub fn video_path(&self) -> PathBuf {
        self.root().join(VIDEO_FILE)
    }

    pub fn timeline_path(&self) -> PathBuf {
        self.frames_dir().join(FRAMES_TIMELINE_FILE)
    }

    /// Where an asset of the given kind is stored once fetched.
    pub fn asset_path(&self, kind: AssetKind) -> PathBuf {
        if kind.is_annotation_table() {
            self.annotations_dir().join(kind.file_name())
        } else {
            self.root().join(kind.file_name())
        }
    }

    /// Path of a frame relative to the dataset root, using `/` separators.
    ///
    /// This is the form written into training records so the output stays
    /// valid when the dataset directory is moved.
    pub fn relative_frame_path(&self, frame_file: &str) -> String {
        format!("{}/{}/{}", self.recording_id.as_str(), FRAMES_DIR, frame_file)
    }
}
