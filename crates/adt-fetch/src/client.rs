//! Streaming HTTP downloader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};

/// Configuration for the downloader.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Upper bound for one request, body included
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: concat!("adt-prep/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP downloader writing into `<dest>.part` and renaming on success, so a
/// file at `dest` is always complete.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
}

impl Downloader {
    /// Create a new downloader.
    pub fn new(config: DownloaderConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| FetchError::ClientConfig(e.to_string()))?;

        Ok(Self { http })
    }

    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// Fails on network errors and non-2xx responses. The partial file is
    /// removed on failure. No retries are attempted.
    pub async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        self.download_verified(url, dest, None).await
    }

    /// Like [`Downloader::download`], but when `sha1` is given the body must
    /// hash to it (lowercase hex) before it is moved to `dest`.
    pub async fn download_verified(&self, url: &str, dest: &Path, sha1: Option<&str>) -> FetchResult<u64> {
        debug!(url, dest = %dest.display(), "Starting download");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let part = part_path(dest);
        let result = match write_body(response, &part).await {
            Ok((bytes, digest)) => match sha1 {
                Some(expected) if !expected.eq_ignore_ascii_case(&digest) => Err(FetchError::ChecksumMismatch {
                    url: url.to_string(),
                    expected: expected.to_string(),
                    actual: digest,
                }),
                _ => Ok(bytes),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                fs::rename(&part, dest).await?;
                debug!(url, dest = %dest.display(), bytes, "Download complete");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&part).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %part.display(), error = %rm, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Stream the body into `part`, returning its size and lowercase hex SHA-1.
async fn write_body(mut response: reqwest::Response, part: &Path) -> FetchResult<(u64, String)> {
    let mut file = fs::File::create(part).await?;
    let mut hasher = Sha1::new();
    let mut bytes = 0u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    let digest = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    Ok((bytes, digest))
}

/// `<dest>.part`
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_config_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("adt-prep/"));
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/data/seq/video.mp4")),
            PathBuf::from("/data/seq/video.mp4.part")
        );
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instances.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("instances.json");
        let downloader = Downloader::new(DownloaderConfig::default()).unwrap();

        let bytes = downloader
            .download(&format!("{}/instances.json", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(bytes, 2);
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "{}");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = Downloader::new(DownloaderConfig::default()).unwrap();

        let err = downloader
            .download(&format!("{}/video.mp4", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_checksum_verified_before_rename() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("abc"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("video.mp4");
        let url = format!("{}/video.mp4", server.uri());
        let downloader = Downloader::new(DownloaderConfig::default()).unwrap();

        let err = downloader
            .download_verified(&url, &dest, Some("0000000000000000000000000000000000000000"))
            .await
            .unwrap_err();
        match err {
            FetchError::ChecksumMismatch { actual, .. } => {
                assert_eq!(actual, "a9993e364706816aba3e25717850c26c9cd0d89d")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        // sha1("abc"), upper-case as some manifests write it
        let bytes = downloader
            .download_verified(&url, &dest, Some("A9993E364706816ABA3E25717850C26C9CD0D89D"))
            .await
            .unwrap();
        assert_eq!(bytes, 3);
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = Downloader::new(DownloaderConfig {
            timeout: Duration::from_millis(200),
            ..Default::default()
        })
        .unwrap();

        let err = downloader
            .download(&format!("{}/video.mp4", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
