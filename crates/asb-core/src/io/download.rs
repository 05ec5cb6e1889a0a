//! Async artifact download with progress reporting.
//!
//! Files land in the bundle's artifacts directory as `{key}{ext}`, where
//! `ext` is taken from the URL. Bytes are streamed to a uniquely named
//! `.part` file next to the destination and renamed into place once
//! complete, so a failed transfer never leaves a truncated artifact behind
//! and concurrent transfers of the same key never share a partial file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::Reporter;
use crate::config::BundleConfig;
use crate::paths::extension_from_url;

/// Errors raised while fetching a file.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level failure (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned {status}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status
        status: StatusCode,
    },

    /// Transient failures persisted through every attempt.
    #[error("Giving up on {key} after {attempts} attempts: {last}")]
    Exhausted {
        /// Download key
        key: String,
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        #[source]
        last: Box<DownloadError>,
    },
}

impl DownloadError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Io(_) | Self::Exhausted { .. } => false,
        }
    }
}

/// Fetches a URL to a file inside the asset root.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` and return the absolute path of the stored file.
    ///
    /// With `enabled == false` no I/O happens and the path the file would
    /// occupy is returned.
    async fn download(
        &self,
        key: &str,
        url: &str,
        enabled: bool,
        progress: Option<&dyn Reporter>,
    ) -> Result<PathBuf, DownloadError>;
}

#[async_trait]
impl<T: Downloader + ?Sized> Downloader for Arc<T> {
    async fn download(
        &self,
        key: &str,
        url: &str,
        enabled: bool,
        progress: Option<&dyn Reporter>,
    ) -> Result<PathBuf, DownloadError> {
        (**self).download(key, url, enabled, progress).await
    }
}

const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// [`Downloader`] backed by `reqwest`, with `file://` URLs copied locally.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    artifacts_dir: PathBuf,
    user_agent: String,
    retries: u32,
    backoff: Duration,
}

impl HttpDownloader {
    /// Build a downloader writing into `artifacts_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        artifacts_dir: impl Into<PathBuf>,
        config: &BundleConfig,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(client, artifacts_dir, config))
    }

    /// Build a downloader around an existing client.
    pub fn with_client(
        client: Client,
        artifacts_dir: impl Into<PathBuf>,
        config: &BundleConfig,
    ) -> Self {
        Self {
            client,
            artifacts_dir: artifacts_dir.into(),
            user_agent: config.user_agent.clone(),
            retries: config.retries,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Base delay between attempts; attempt `n` waits `n * backoff`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Where `key` fetched from `url` is stored.
    pub fn destination(&self, key: &str, url: &str) -> PathBuf {
        self.artifacts_dir
            .join(format!("{key}{}", extension_from_url(url)))
    }

    async fn fetch(
        &self,
        key: &str,
        url: &str,
        dest: &Path,
        progress: Option<&dyn Reporter>,
    ) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }

        let total = response.content_length();
        if let Some(rep) = progress {
            rep.downloading(key, 0, total);
        }

        // Removed on drop unless persisted
        let part = partial_file(dest)?;
        let size = stream_to_file(response, &part, key, total, progress).await?;
        persist(part, dest)?;
        Ok(size)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        key: &str,
        url: &str,
        enabled: bool,
        progress: Option<&dyn Reporter>,
    ) -> Result<PathBuf, DownloadError> {
        let dest = self.destination(key, url);
        if !enabled {
            debug!("Download of {key} disabled, deferring {url}");
            return Ok(dest);
        }

        fs::create_dir_all(&self.artifacts_dir).await?;

        if let Some(local) = url.strip_prefix("file://") {
            let result = copy_local(key, Path::new(local), &dest, progress).await;
            return finish(key, &dest, result, progress);
        }

        let attempts = self.retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Fetching {url} as {key} (attempt {attempt}/{attempts})");
            match self.fetch(key, url, &dest, progress).await {
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!("Download of {key} failed: {e}, retrying ({attempt}/{attempts})...");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) if e.is_transient() && attempt > 1 => {
                    let exhausted = DownloadError::Exhausted {
                        key: key.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    };
                    return finish(key, &dest, Err(exhausted), progress);
                }
                result => return finish(key, &dest, result, progress),
            }
        }
    }
}

fn finish(
    key: &str,
    dest: &Path,
    result: Result<u64, DownloadError>,
    progress: Option<&dyn Reporter>,
) -> Result<PathBuf, DownloadError> {
    match result {
        Ok(size) => {
            info!("Stored {key} at {} ({size} bytes)", dest.display());
            if let Some(rep) = progress {
                rep.done(key, "downloaded", Some(size));
            }
            Ok(dest.to_path_buf())
        }
        Err(e) => {
            if let Some(rep) = progress {
                rep.failed(key, &e.to_string());
            }
            Err(e)
        }
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    part: &Path,
    key: &str,
    total: Option<u64>,
    progress: Option<&dyn Reporter>,
) -> Result<u64, DownloadError> {
    let mut file = File::create(part).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if let Some(rep) = progress {
            rep.downloading(key, downloaded, total);
        }
    }

    file.flush().await?;
    Ok(downloaded)
}

async fn copy_local(
    key: &str,
    source: &Path,
    dest: &Path,
    progress: Option<&dyn Reporter>,
) -> Result<u64, DownloadError> {
    let total = fs::metadata(source).await?.len();
    if let Some(rep) = progress {
        rep.downloading(key, 0, Some(total));
    }
    let part = partial_file(dest)?;
    fs::copy(source, &part).await?;
    persist(part, dest)?;
    if let Some(rep) = progress {
        rep.downloading(key, total, Some(total));
    }
    Ok(total)
}

/// Fresh `{dest}.XXXXXX.part` in the destination's directory.
fn partial_file(dest: &Path) -> Result<TempPath, DownloadError> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let prefix = dest
        .file_name()
        .map(|name| format!("{}.", name.to_string_lossy()))
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

fn persist(part: TempPath, dest: &Path) -> Result<(), DownloadError> {
    part.persist(dest).map_err(|e| DownloadError::Io(e.error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn downloading(&self, key: &str, current: u64, total: Option<u64>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("progress {key} {current}/{total:?}"));
        }
        fn done(&self, key: &str, _: &str, size: Option<u64>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {key} {size:?}"));
        }
        fn failed(&self, key: &str, _: &str) {
            self.events.lock().unwrap().push(format!("failed {key}"));
        }
        fn info(&self, _: &str) {}
        fn warning(&self, _: &str) {}
    }

    fn downloader(dir: &Path, retries: u32) -> HttpDownloader {
        let config = BundleConfig {
            retries,
            ..BundleConfig::default()
        };
        HttpDownloader::new(dir.join("artifacts"), &config)
            .unwrap()
            .with_backoff(Duration::ZERO)
    }

    fn artifact_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.join("artifacts"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_download_streams_to_artifacts_dir() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/core.bin")
            .with_status(200)
            .with_body("binary-content")
            .expect(1)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dl = downloader(temp.path(), 3);
        let reporter = RecordingReporter::default();
        let url = format!("{}/core.bin", server.url());

        let path = dl
            .download("core-x64", &url, true, Some(&reporter))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(path, temp.path().join("artifacts/core-x64.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), b"binary-content");
        assert_eq!(artifact_names(temp.path()), vec!["core-x64.bin"]);

        let events = reporter.events.lock().unwrap();
        assert_eq!(events.last().unwrap(), "done core-x64 Some(14)");
    }

    #[tokio::test]
    async fn test_disabled_download_is_pass_through() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/core.bin")
            .expect(0)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dl = downloader(temp.path(), 3);
        let url = format!("{}/core.bin", server.url());

        let path = dl.download("core-x64", &url, false, None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(path, temp.path().join("artifacts/core-x64.bin"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.bin")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dl = downloader(temp.path(), 3);
        let reporter = RecordingReporter::default();
        let url = format!("{}/missing.bin", server.url());

        let err = dl
            .download("core-x64", &url, true, Some(&reporter))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, DownloadError::Status { status, .. } if status == StatusCode::NOT_FOUND));
        assert!(artifact_names(temp.path()).is_empty());
        assert_eq!(
            reporter.events.lock().unwrap().last().unwrap(),
            "failed core-x64"
        );
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky.bin")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dl = downloader(temp.path(), 2);
        let url = format!("{}/flaky.bin", server.url());

        let err = dl.download("flaky-x64", &url, true, None).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, DownloadError::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_file_url_is_copied() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("local.tar.gz");
        std::fs::write(&source, b"archive").unwrap();

        let dl = downloader(temp.path(), 1);
        let url = format!("file://{}", source.display());

        let path = dl.download("data-noarch", &url, true, None).await.unwrap();

        assert_eq!(path, temp.path().join("artifacts/data-noarch.tar.gz"));
        assert_eq!(std::fs::read(path).unwrap(), b"archive");
    }

    #[tokio::test]
    async fn test_same_key_downloads_do_not_share_partial_file() {
        let mut server = Server::new_async().await;
        let body = "x".repeat(256 * 1024);
        let mock = server
            .mock("GET", "/core.bin")
            .with_status(200)
            .with_body(&body)
            .expect(2)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dl = downloader(temp.path(), 1);
        let url = format!("{}/core.bin", server.url());

        let (a, b) = futures::join!(
            dl.download("core-x64", &url, true, None),
            dl.download("core-x64", &url, true, None)
        );

        mock.assert_async().await;
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("artifacts/core-x64.bin")).unwrap(),
            body
        );
        assert_eq!(artifact_names(temp.path()), vec!["core-x64.bin"]);
    }

    #[test]
    fn test_partial_file_is_unique_and_cleaned_up() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("core-x64.bin");

        let first = partial_file(&dest).unwrap();
        let second = partial_file(&dest).unwrap();
        assert_ne!(first.to_path_buf(), second.to_path_buf());
        assert!(first.to_string_lossy().ends_with(".part"));

        let leftover = first.to_path_buf();
        drop(first);
        assert!(!leftover.exists());

        persist(second, &dest).unwrap();
        assert!(dest.exists());
    }
}
