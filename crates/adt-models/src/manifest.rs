//! Asset manifest parsing.
//!
//! Two shapes are accepted:
//!
//! ```json
//! { "seq_a": { "video": "https://...", "instances": "https://..." } }
//! ```
//!
//! and the ADT download-urls file:
//!
//! ```json
//! { "sequences": { "seq_a": {
//!     "video_main_rgb": { "filename": "...", "download_url": "https://...", "sha1sum": "..." },
//!     "main_groundtruth": { "download_url": "https://..." } } } }
//! ```

use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::asset::{Asset, AssetKind};
use crate::error::{ManifestError, ManifestResult};
use crate::recording::RecordingId;

/// All assets of one recording, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub recording_id: RecordingId,
    pub assets: Vec<Asset>,
}

impl ManifestEntry {
    pub fn asset(&self, kind: AssetKind) -> Option<&Asset> {
        self.assets.iter().find(|a| a.kind == kind)
    }

    /// Whether the entry will yield an `instances.json`, either directly or
    /// through the ground-truth archive.
    pub fn provides_instances(&self) -> bool {
        self.asset(AssetKind::Instances).is_some()
            || self.asset(AssetKind::GroundTruthArchive).is_some()
    }

    fn missing_required(&self) -> Vec<AssetKind> {
        let mut missing = Vec::new();
        if self.asset(AssetKind::Video).is_none() {
            missing.push(AssetKind::Video);
        }
        if !self.provides_instances() {
            missing.push(AssetKind::Instances);
        }
        missing
    }
}

/// Why a manifest entry was not selected for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Entry lacks assets needed downstream
    MissingAssets(Vec<AssetKind>),
    /// Recording id cannot be used as a directory name
    InvalidId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingAssets(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                write!(f, "missing required assets: {}", names.join(", "))
            }
            SkipReason::InvalidId => write!(f, "recording id is not a valid directory name"),
        }
    }
}

/// Manifest entry rejected during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub recording_id: RecordingId,
    pub reason: SkipReason,
}

/// Parsed manifest: usable entries plus the ones that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    pub entries: Vec<ManifestEntry>,
    pub skipped: Vec<SkippedEntry>,
}

impl AssetManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json_str(json: &str) -> ManifestResult<Self> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(root) = root else {
            return Err(ManifestError::format("top level must be a JSON object"));
        };

        let recordings = match root.get("sequences") {
            Some(Value::Object(sequences)) => sequences,
            Some(_) => return Err(ManifestError::format("`sequences` must be a JSON object")),
            None => &root,
        };

        if recordings.is_empty() {
            return Err(ManifestError::format("manifest contains no recordings"));
        }

        let mut manifest = AssetManifest::default();
        for (id, value) in recordings {
            let recording_id = RecordingId::from(id.as_str());
            let Value::Object(assets) = value else {
                return Err(ManifestError::format(format!(
                    "entry `{}` must be a JSON object",
                    id
                )));
            };

            let entry = ManifestEntry {
                assets: parse_assets(&recording_id, assets)?,
                recording_id,
            };

            let reason = if !entry.recording_id.is_safe_dir_name() {
                Some(SkipReason::InvalidId)
            } else {
                let missing = entry.missing_required();
                (!missing.is_empty()).then_some(SkipReason::MissingAssets(missing))
            };

            match reason {
                Some(reason) => {
                    warn!(
                        recording_id = %entry.recording_id,
                        reason = %reason,
                        "Skipping manifest entry"
                    );
                    manifest.skipped.push(SkippedEntry {
                        recording_id: entry.recording_id,
                        reason,
                    });
                }
                None => manifest.entries.push(entry),
            }
        }

        Ok(manifest)
    }

    /// Number of usable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read and parse the manifest file at `path`.
pub fn read_manifest(path: impl AsRef<Path>) -> ManifestResult<AssetManifest> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    AssetManifest::from_json_str(&json)
}

fn parse_assets(recording_id: &RecordingId, assets: &Map<String, Value>) -> ManifestResult<Vec<Asset>> {
    let mut parsed: Vec<Asset> = Vec::new();

    for (key, value) in assets {
        let Some(kind) = AssetKind::from_key(key) else {
            debug!(recording_id = %recording_id, key = %key, "Ignoring unknown asset kind");
            continue;
        };

        let (url, sha1) = match value {
            Value::String(url) => (url.as_str(), None),
            Value::Object(obj) => match obj.get("download_url") {
                Some(Value::String(url)) => (url.as_str(), parse_sha1(recording_id, key, obj)),
                _ => {
                    return Err(ManifestError::format(format!(
                        "asset `{}` of `{}` has no `download_url`",
                        key, recording_id
                    )))
                }
            },
            _ => {
                return Err(ManifestError::format(format!(
                    "asset `{}` of `{}` must be a URL string or an object",
                    key, recording_id
                )))
            }
        };

        if url.trim().is_empty() {
            warn!(recording_id = %recording_id, asset = %kind, "Ignoring asset with empty URL");
            continue;
        }

        if parsed.iter().any(|a| a.kind == kind) {
            warn!(recording_id = %recording_id, asset = %kind, key = %key, "Duplicate asset kind, keeping the first");
            continue;
        }

        let asset = Asset::new(kind, url.trim());
        parsed.push(match sha1 {
            Some(sha1) => asset.with_sha1(sha1),
            None => asset,
        });
    }

    Ok(parsed)
}

/// `sha1sum` of an asset object. Values that are not 40 hex digits are
/// ignored rather than failing every download of the asset.
fn parse_sha1<'a>(recording_id: &RecordingId, key: &str, obj: &'a Map<String, Value>) -> Option<&'a str> {
    let sha1 = obj.get("sha1sum")?.as_str()?.trim();
    if sha1.len() == 40 && sha1.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(sha1)
    } else {
        warn!(recording_id = %recording_id, key = %key, "Ignoring malformed sha1sum");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_manifest_keeps_order() {
        let json = r#"{
            "seq_b": {"video": "http://h/b.mp4", "instances": "http://h/b.json"},
            "seq_a": {"video": "http://h/a.mp4", "instances": "http://h/a.json",
                      "2d_bounding_box": "http://h/a.csv"}
        }"#;
        let manifest = AssetManifest::from_json_str(json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries[0].recording_id.as_str(), "seq_b");
        assert_eq!(manifest.entries[1].recording_id.as_str(), "seq_a");
        assert_eq!(
            manifest.entries[1].asset(AssetKind::BoundingBox2d).unwrap().url,
            "http://h/a.csv"
        );
        assert!(manifest.skipped.is_empty());
    }

    #[test]
    fn test_parse_adt_download_urls() {
        let json = r#"{"sequences": {
            "Apartment_release_clean_seq131_M1292": {
                "video_main_rgb": {"filename": "v.mp4", "download_url": "http://h/v.mp4", "sha1sum": "abc"},
                "main_groundtruth": {"filename": "gt.zip", "download_url": "http://h/gt.zip"},
                "segmentations": {"download_url": "http://h/seg.zip"}
            }
        }}"#;
        let manifest = AssetManifest::from_json_str(json).unwrap();
        let entry = &manifest.entries[0];
        assert_eq!(entry.assets.len(), 2);
        assert!(entry.asset(AssetKind::Video).is_some());
        assert!(entry.provides_instances());
        // "abc" is not a SHA-1 digest
        assert_eq!(entry.asset(AssetKind::Video).unwrap().sha1, None);
    }

    #[test]
    fn test_sha1sum_is_carried_lowercased() {
        let json = r#"{"sequences": {"seq": {
            "video_main_rgb": {"download_url": "http://h/v.mp4",
                               "sha1sum": "A94A8FE5CCB19BA61C4C0873D391E987982FBBD3"},
            "main_groundtruth": {"download_url": "http://h/gt.zip"}
        }}}"#;
        let manifest = AssetManifest::from_json_str(json).unwrap();
        let entry = &manifest.entries[0];
        assert_eq!(
            entry.asset(AssetKind::Video).unwrap().sha1.as_deref(),
            Some("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3")
        );
        assert_eq!(entry.asset(AssetKind::GroundTruthArchive).unwrap().sha1, None);
    }

    #[test]
    fn test_entries_missing_required_assets_are_reported() {
        let json = r#"{
            "no_video": {"instances": "http://h/i.json"},
            "no_instances": {"video": "http://h/v.mp4"},
            "ok": {"video": "http://h/v.mp4", "instances": "http://h/i.json"}
        }"#;
        let manifest = AssetManifest::from_json_str(json).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.skipped.len(), 2);
        assert_eq!(
            manifest.skipped[0].reason,
            SkipReason::MissingAssets(vec![AssetKind::Video])
        );
        assert_eq!(
            manifest.skipped[1].reason,
            SkipReason::MissingAssets(vec![AssetKind::Instances])
        );
    }

    #[test]
    fn test_unsafe_recording_id_is_skipped() {
        let json = r#"{"../escape": {"video": "http://h/v.mp4", "instances": "http://h/i.json"}}"#;
        let manifest = AssetManifest::from_json_str(json).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.skipped[0].reason, SkipReason::InvalidId);
    }

    #[test]
    fn test_format_errors() {
        assert!(matches!(
            AssetManifest::from_json_str("not json"),
            Err(ManifestError::InvalidJson(_))
        ));
        assert!(matches!(
            AssetManifest::from_json_str("[1, 2]"),
            Err(ManifestError::Format(_))
        ));
        assert!(matches!(
            AssetManifest::from_json_str(r#"{"sequences": []}"#),
            Err(ManifestError::Format(_))
        ));
        assert!(matches!(
            AssetManifest::from_json_str("{}"),
            Err(ManifestError::Format(_))
        ));
        assert!(matches!(
            AssetManifest::from_json_str(r#"{"seq": {"video": 42}}"#),
            Err(ManifestError::Format(_))
        ));
    }

    #[test]
    fn test_read_manifest_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_manifest(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
