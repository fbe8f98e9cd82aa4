//! Asset kinds of an ADT recording bundle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a downloadable asset.
///
/// Each annotation kind maps onto exactly one file under the recording's
/// `annotations/` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Main RGB video stream
    Video,
    /// 2D bounding boxes per stream and timestamp
    BoundingBox2d,
    /// 3D bounding boxes per timestamp
    BoundingBox3d,
    /// Device trajectory
    Trajectory,
    /// Eye gaze
    EyeGaze,
    /// Object instance metadata (static / dynamic classification)
    Instances,
    /// Recording metadata
    Metadata,
    /// Scene object poses
    SceneObjects,
    /// Zipped ground-truth bundle that unpacks into all annotation tables
    GroundTruthArchive,
}

impl AssetKind {
    /// Annotation tables stored under `annotations/`.
    pub const ANNOTATION_TABLES: [AssetKind; 7] = [
        AssetKind::BoundingBox2d,
        AssetKind::BoundingBox3d,
        AssetKind::Trajectory,
        AssetKind::EyeGaze,
        AssetKind::Instances,
        AssetKind::Metadata,
        AssetKind::SceneObjects,
    ];

    /// Parse a manifest key.
    ///
    /// Accepts both the short kind names and the keys used by the ADT
    /// download-urls file (`video_main_rgb`, `main_groundtruth`).
    pub fn from_key(key: &str) -> Option<Self> {
        let kind = match key.trim().to_ascii_lowercase().as_str() {
            "video" | "video_main_rgb" | "main_video" => AssetKind::Video,
            "2d_bounding_box" | "2d_boxes" | "bbox_2d" => AssetKind::BoundingBox2d,
            "3d_bounding_box" | "3d_boxes" | "bbox_3d" => AssetKind::BoundingBox3d,
            "aria_trajectory" | "trajectory" => AssetKind::Trajectory,
            "eyegaze" | "eye_gaze" => AssetKind::EyeGaze,
            "instances" => AssetKind::Instances,
            "metadata" => AssetKind::Metadata,
            "scene_objects" => AssetKind::SceneObjects,
            "groundtruth" | "main_groundtruth" => AssetKind::GroundTruthArchive,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical name used in logs and manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::BoundingBox2d => "2d_bounding_box",
            AssetKind::BoundingBox3d => "3d_bounding_box",
            AssetKind::Trajectory => "aria_trajectory",
            AssetKind::EyeGaze => "eyegaze",
            AssetKind::Instances => "instances",
            AssetKind::Metadata => "metadata",
            AssetKind::SceneObjects => "scene_objects",
            AssetKind::GroundTruthArchive => "groundtruth",
        }
    }

    /// File name of the asset once it is on disk.
    pub fn file_name(&self) -> &'static str {
        match self {
            AssetKind::Video => crate::layout::VIDEO_FILE,
            AssetKind::BoundingBox2d => "2d_bounding_box.csv",
            AssetKind::BoundingBox3d => "3d_bounding_box.csv",
            AssetKind::Trajectory => "aria_trajectory.csv",
            AssetKind::EyeGaze => "eyegaze.csv",
            AssetKind::Instances => "instances.json",
            AssetKind::Metadata => "metadata.json",
            AssetKind::SceneObjects => "scene_objects.csv",
            AssetKind::GroundTruthArchive => "groundtruth.zip",
        }
    }

    /// Whether the asset lands in `annotations/`.
    pub fn is_annotation_table(&self) -> bool {
        Self::ANNOTATION_TABLES.contains(self)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single downloadable asset of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub kind: AssetKind,
    pub url: String,
    /// Lowercase hex SHA-1 of the file, when the manifest lists one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

impl Asset {
    pub fn new(kind: AssetKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            sha1: None,
        }
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into().to_ascii_lowercase());
        self
    }
}
