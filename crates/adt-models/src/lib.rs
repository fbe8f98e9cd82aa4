//! Shared data models for the ADT dataset preparation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Asset manifests and asset kinds
//! - The on-disk recording layout
//! - Object instance metadata
//! - Frame timelines shared by the extract and prepare stages
//! - Training records emitted by the prepare stage

pub mod asset;
pub mod error;
pub mod instance;
pub mod layout;
pub mod manifest;
pub mod record;
pub mod recording;
pub mod timeline;
pub mod utils;

// Re-export common types
pub use asset::{Asset, AssetKind};
pub use error::{ManifestError, ManifestResult};
pub use instance::{MotionType, ObjectInstance, ObjectUid};
pub use layout::{RecordingLayout, FRAMES_TIMELINE_FILE, VIDEO_FILE};
pub use manifest::{read_manifest, AssetManifest, ManifestEntry, SkipReason, SkippedEntry};
pub use record::TrainingRecord;
pub use recording::RecordingId;
pub use timeline::FrameTimeline;
pub use utils::parse_activity_label;
