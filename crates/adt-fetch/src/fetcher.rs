//! Bundle fetcher.
//!
//! Downloads up to `max_download` recordings from a manifest, in manifest
//! order, into `{dataset_dir}/{recording_id}/`. Recordings whose expected
//! files are all present are skipped, and within a recording files that
//! already exist are not downloaded again.

use std::fmt;
use std::path::{Path, PathBuf};

use adt_models::{Asset, AssetKind, AssetManifest, ManifestEntry, RecordingId, RecordingLayout};
use tokio::fs;
use tracing::{info, warn};

use crate::archive::{unpack_groundtruth, UNPACKED_MARKER};
use crate::client::Downloader;
use crate::error::{FetchError, FetchResult};

/// A single asset that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub kind: AssetKind,
    pub error: String,
}

impl fmt::Display for AssetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

/// Result of fetching one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// Every expected file already existed; nothing was downloaded
    AlreadyPresent,
    /// All assets are now on disk
    Complete { downloaded: usize },
    /// At least one asset is missing after this run
    Incomplete { failures: Vec<AssetFailure> },
}

impl FetchStatus {
    pub fn is_complete(&self) -> bool {
        !matches!(self, FetchStatus::Incomplete { .. })
    }
}

/// Per-recording fetch outcome.
#[derive(Debug, Clone)]
pub struct RecordingFetch {
    pub layout: RecordingLayout,
    pub status: FetchStatus,
}

impl RecordingFetch {
    pub fn recording_id(&self) -> &RecordingId {
        self.layout.recording_id()
    }
}

/// Outcome of a fetch run.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Recordings selected for this run, in manifest order
    pub recordings: Vec<RecordingFetch>,
    /// Usable manifest entries left untouched because of `max_download`
    pub not_selected: usize,
}

impl FetchReport {
    /// Recordings with every asset on disk.
    pub fn complete_count(&self) -> usize {
        self.recordings.iter().filter(|r| r.status.is_complete()).count()
    }

    /// Recordings with at least one missing asset.
    pub fn failed_count(&self) -> usize {
        self.recordings.len() - self.complete_count()
    }

    /// A run succeeds when at least one recording is complete.
    pub fn is_success(&self) -> bool {
        self.complete_count() > 0
    }
}

/// Fetches recording bundles described by a manifest.
#[derive(Debug, Clone)]
pub struct BundleFetcher {
    downloader: Downloader,
}

impl BundleFetcher {
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }

    /// Fetch at most `max_download` recordings into `dataset_dir`.
    ///
    /// Only failing to create `dataset_dir` is an error; asset failures are
    /// reported per recording.
    pub async fn fetch(
        &self,
        manifest: &AssetManifest,
        dataset_dir: &Path,
        max_download: usize,
    ) -> FetchResult<FetchReport> {
        let (selected, mut report) = self.select(manifest, dataset_dir, max_download).await?;
        for entry in selected {
            report.recordings.push(self.fetch_entry(entry, dataset_dir).await);
        }
        Ok(report)
    }

    /// Create `dataset_dir` and pick the entries a run will fetch, in
    /// manifest order. The returned report has `not_selected` set and no
    /// recordings yet.
    pub async fn select<'m>(
        &self,
        manifest: &'m AssetManifest,
        dataset_dir: &Path,
        max_download: usize,
    ) -> FetchResult<(&'m [ManifestEntry], FetchReport)> {
        fs::create_dir_all(dataset_dir).await?;

        let selected = manifest.entries.len().min(max_download);
        let report = FetchReport {
            recordings: Vec::with_capacity(selected),
            not_selected: manifest.entries.len() - selected,
        };

        if report.not_selected > 0 {
            info!(
                max_download,
                not_selected = report.not_selected,
                "Reached max_download limit, remaining recordings left untouched"
            );
        }

        Ok((&manifest.entries[..selected], report))
    }

    /// Fetch one recording into `{dataset_dir}/{recording_id}/`.
    pub async fn fetch_entry(&self, entry: &ManifestEntry, dataset_dir: &Path) -> RecordingFetch {
        let layout = RecordingLayout::new(dataset_dir, entry.recording_id.clone());
        let status = self.fetch_recording(entry, &layout).await;

        match &status {
            FetchStatus::AlreadyPresent => {
                info!(recording_id = %entry.recording_id, "Recording already present, skipping")
            }
            FetchStatus::Complete { downloaded } => {
                info!(recording_id = %entry.recording_id, downloaded, "Recording fetched")
            }
            FetchStatus::Incomplete { failures } => warn!(
                recording_id = %entry.recording_id,
                failed_assets = failures.len(),
                "Recording incomplete"
            ),
        }

        RecordingFetch { layout, status }
    }

    async fn fetch_recording(&self, entry: &ManifestEntry, layout: &RecordingLayout) -> FetchStatus {
        if is_complete(entry, layout) {
            return FetchStatus::AlreadyPresent;
        }

        let mut failures = Vec::new();
        for dir in [layout.frames_dir(), layout.annotations_dir()] {
            if let Err(e) = fs::create_dir_all(&dir).await {
                // Nothing can be stored for this recording
                warn!(recording_id = %entry.recording_id, dir = %dir.display(), error = %e, "Failed to create recording directory");
                return FetchStatus::Incomplete {
                    failures: entry
                        .assets
                        .iter()
                        .map(|a| AssetFailure {
                            kind: a.kind,
                            error: e.to_string(),
                        })
                        .collect(),
                };
            }
        }

        let mut downloaded = 0;
        for asset in &entry.assets {
            let result = match asset.kind {
                AssetKind::GroundTruthArchive => self.fetch_archive(asset, layout).await,
                kind => {
                    let dest = layout.asset_path(kind);
                    if dest.exists() {
                        continue;
                    }
                    self.downloader
                        .download_verified(&asset.url, &dest, asset.sha1.as_deref())
                        .await
                        .map(|_| true)
                }
            };

            match result {
                Ok(true) => {
                    downloaded += 1;
                    metrics::counter!("adt_assets_downloaded_total", "kind" => asset.kind.as_str())
                        .increment(1);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        recording_id = %entry.recording_id,
                        asset = %asset.kind,
                        url = %asset.url,
                        error = %e,
                        "Asset fetch failed"
                    );
                    metrics::counter!("adt_asset_failures_total", "kind" => asset.kind.as_str())
                        .increment(1);
                    failures.push(AssetFailure {
                        kind: asset.kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            FetchStatus::Complete { downloaded }
        } else {
            FetchStatus::Incomplete { failures }
        }
    }

    /// Download (if needed) and unpack the ground-truth archive. Returns
    /// whether anything was downloaded.
    ///
    /// A zip that fails to unpack is deleted so the next run fetches it
    /// again instead of retrying the same bytes.
    async fn fetch_archive(&self, asset: &Asset, layout: &RecordingLayout) -> FetchResult<bool> {
        if archive_unpacked(layout) {
            return Ok(false);
        }

        let archive = layout.asset_path(AssetKind::GroundTruthArchive);
        let downloaded = if archive.exists() {
            false
        } else {
            self.downloader
                .download_verified(&asset.url, &archive, asset.sha1.as_deref())
                .await?;
            true
        };

        if let Err(e) = unpack_groundtruth(&archive, &layout.annotations_dir()).await {
            if let Err(rm) = fs::remove_file(&archive).await {
                warn!(path = %archive.display(), error = %rm, "Failed to remove unusable archive");
            }
            return Err(e);
        }
        fs::remove_file(&archive).await.map_err(FetchError::Io)?;
        Ok(downloaded)
    }
}

fn marker_path(layout: &RecordingLayout) -> PathBuf {
    layout.annotations_dir().join(UNPACKED_MARKER)
}

fn archive_unpacked(layout: &RecordingLayout) -> bool {
    marker_path(layout).exists()
}

/// Paths that must exist for the entry to count as fully fetched.
fn expected_files(entry: &ManifestEntry, layout: &RecordingLayout) -> Vec<PathBuf> {
    let mut files = vec![layout.frames_dir(), layout.annotations_dir()];
    for asset in &entry.assets {
        match asset.kind {
            AssetKind::GroundTruthArchive => {
                files.push(marker_path(layout));
                files.push(layout.asset_path(AssetKind::Instances));
            }
            kind => files.push(layout.asset_path(kind)),
        }
    }
    files
}

/// Existence check; checksums are only verified while downloading.
fn is_complete(entry: &ManifestEntry, layout: &RecordingLayout) -> bool {
    expected_files(entry, layout).iter().all(|p| p.exists())
}
