//! Manifest-driven download of ADT recording bundles.
//!
//! Downloads are best-effort: a failed asset is logged and recorded in the
//! report, never retried, and never aborts the batch.

pub mod archive;
pub mod client;
pub mod error;
pub mod fetcher;

pub use archive::{unpack_groundtruth, UNPACKED_MARKER};
pub use client::{Downloader, DownloaderConfig};
pub use error::{FetchError, FetchResult};
pub use fetcher::{AssetFailure, BundleFetcher, FetchReport, FetchStatus, RecordingFetch};
