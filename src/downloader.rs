use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Callback type for reporting download progress.
/// Arguments: source URL, bytes downloaded, total bytes, MiB/s, is_complete
pub type ProgressFn = Arc<dyn Fn(&str, u64, u64, f64, bool) + Send + Sync>;

/// Default host serving release assets.
pub const GITHUB_DOWNLOADS: &str = "https://github.com";

/// Downloads release assets straight to a file.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    download_base: String,
    repo: String,
    progress: Option<ProgressFn>,
}

impl Downloader {
    pub fn new(client: Client, download_base: &str, repo: &str) -> Self {
        Self {
            client,
            download_base: download_base.trim_end_matches('/').to_owned(),
            repo: repo.to_owned(),
            progress: None,
        }
    }

    /// Report progress through `progress` while downloading.
    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Return the download URL for a named asset of a specific release version.
    pub fn asset_url(&self, version: &str, asset_name: &str) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            self.download_base, self.repo, version, asset_name
        )
    }

    /// Stream `url` into a file at `dest`, replacing whatever is there.
    ///
    /// The body lands in a sibling `.part` file that is renamed over `dest`
    /// only once it is complete, so a failed download leaves an existing
    /// file untouched. The `.part` file is created before the request is
    /// made, so an unwritable destination fails without touching the network.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let part = part_path(dest);
        let file = tokio::fs::File::create(&part)
            .await
            .map_err(|source| Error::Create {
                path: part.clone(),
                source,
            })?;

        let result = match self.fetch(url, file, &part).await {
            Ok(downloaded) => replace(&part, dest).await.map(|()| downloaded),
            err => err,
        };
        let downloaded = match result {
            Ok(downloaded) => downloaded,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part).await {
                    warn!(path = %part.display(), error = %rm, "failed to remove partial download");
                }
                return Err(e);
            }
        };

        debug!(%url, bytes = downloaded, "download finished");
        Ok(())
    }

    async fn fetch(&self, url: &str, mut file: tokio::fs::File, path: &Path) -> Result<u64> {
        debug!(%url, dest = %path.display(), "downloading asset");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.to_owned(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(Error::Status {
                url: url.to_owned(),
                status: resp.status(),
            });
        }

        let copy_err = |source: std::io::Error| Error::Copy {
            path: path.to_owned(),
            source,
        };

        let total = resp.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;
        let mut stream = resp.bytes_stream();
        let start = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| copy_err(std::io::Error::other(e)))?;
            downloaded += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(copy_err)?;
            self.report(url, downloaded, total, start, false);
        }
        file.flush().await.map_err(copy_err)?;

        self.report(url, downloaded, total, start, true);
        Ok(downloaded)
    }

    fn report(&self, src: &str, downloaded: u64, total: u64, start: Instant, complete: bool) {
        if let Some(progress) = &self.progress {
            let elapsed = start.elapsed().as_secs_f64();
            let mib_per_sec = if elapsed > 0.0 {
                (downloaded as f64) / (1024.0 * 1024.0) / elapsed
            } else {
                0.0
            };
            progress(src, downloaded, total, mib_per_sec, complete);
        }
    }
}

/// Move the finished `part` over `dest`, carrying over the permissions of
/// a file already at `dest`.
async fn replace(part: &Path, dest: &Path) -> Result<()> {
    if let Ok(existing) = tokio::fs::metadata(dest).await {
        tokio::fs::set_permissions(part, existing.permissions())
            .await
            .map_err(|source| Error::Permissions {
                path: part.to_owned(),
                source,
            })?;
    }
    tokio::fs::rename(part, dest)
        .await
        .map_err(|source| Error::Copy {
            path: dest.to_owned(),
            source,
        })
}

/// Hidden sibling of `dest` that receives the body while it downloads.
fn part_path(dest: &Path) -> PathBuf {
    match dest.file_name() {
        Some(name) => {
            let mut part = OsString::from(".");
            part.push(name);
            part.push(".part");
            dest.with_file_name(part)
        }
        None => dest.with_extension("part"),
    }
}
