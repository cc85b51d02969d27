use std::path::Path;
use std::time::Duration;

use crate::downloader::{Downloader, ProgressFn, GITHUB_DOWNLOADS};
use crate::error::Result;
use crate::install::{Install, ASSET_NAME};
use crate::progress::default_progress_fn;
use crate::release::{
    http_client, ProxyConfig, Release, ReleaseClient, DEFAULT_TIMEOUT, GITHUB_API, REPO,
};
use crate::runner::YtDlp;

// ──────────────────────────────────────────────────────────────────────────────
// Api
// ──────────────────────────────────────────────────────────────────────────────

/// Top-level entry-point with a chainable builder API.
///
/// # Example
/// ```rust,no_run
/// use ytdlp::Api;
///
/// #[tokio::main]
/// async fn main() -> ytdlp::Result<()> {
///     let ytdlp = Api::new().latest().install("./yt-dlp").await?;
///     println!("{}", ytdlp.version().await?);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Api {
    timeout: Duration,
    proxy: ProxyConfig,
    progress: Option<ProgressFn>,
    repo: String,
    asset_name: String,
    api_base: String,
    download_base: String,
}

impl Api {
    /// Create a new `Api` with sensible defaults.
    ///
    /// Proxy is read from `HTTP_PROXY` / `HTTPS_PROXY` environment variables.
    pub fn new() -> Self {
        let proxy = std::env::var("HTTP_PROXY")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("HTTPS_PROXY").ok().filter(|s| !s.is_empty()))
            .map_or(ProxyConfig::System, ProxyConfig::Url);

        Self {
            timeout: DEFAULT_TIMEOUT,
            proxy,
            progress: Some(default_progress_fn()),
            repo: REPO.to_owned(),
            asset_name: ASSET_NAME.to_owned(),
            api_base: GITHUB_API.to_owned(),
            download_base: GITHUB_DOWNLOADS.to_owned(),
        }
    }

    /// Set the total timeout of every HTTP request (builder).
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set an explicit HTTP/HTTPS proxy URL (builder).
    pub fn set_proxy(mut self, proxy: &str) -> Self {
        self.proxy = ProxyConfig::Url(proxy.to_owned());
        self
    }

    /// Ignore every proxy setting and connect directly (builder).
    pub fn no_proxy(mut self) -> Self {
        self.proxy = ProxyConfig::Direct;
        self
    }

    /// Override the progress callback (builder).
    pub fn set_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Disable progress output (builder).
    pub fn no_progress(mut self) -> Self {
        self.progress = None;
        self
    }

    /// Install from a fork in `owner/repo` format (builder).
    pub fn set_repo(mut self, repo: &str) -> Self {
        self.repo = repo.to_owned();
        self
    }

    /// Download a different release asset, e.g. `yt-dlp_linux` (builder).
    pub fn set_asset_name(mut self, asset_name: &str) -> Self {
        self.asset_name = asset_name.to_owned();
        self
    }

    /// Point release queries at another GitHub API host (builder).
    pub fn set_api_base(mut self, url: &str) -> Self {
        self.api_base = url.to_owned();
        self
    }

    /// Point asset downloads at another host (builder).
    pub fn set_download_base(mut self, url: &str) -> Self {
        self.download_base = url.to_owned();
        self
    }

    /// Fetch one page of releases.
    pub async fn releases(&self, page: u32, per_page: u32) -> Result<Vec<Release>> {
        self.release_client()?.releases(page, per_page).await
    }

    /// Target the latest release.
    pub fn latest(self) -> VersionApi {
        VersionApi {
            api: self,
            version: None,
        }
    }

    /// Target a specific release version (e.g. `"2024.12.13"`).
    pub fn version(self, version: &str) -> VersionApi {
        VersionApi {
            api: self,
            version: Some(version.to_owned()),
        }
    }

    fn release_client(&self) -> Result<ReleaseClient> {
        let client = http_client(self.timeout, &self.proxy)?;
        Ok(ReleaseClient::with_client(client, &self.api_base, &self.repo))
    }

    fn installer(&self) -> Result<Install> {
        let client = http_client(self.timeout, &self.proxy)?;
        let downloader = Downloader::new(client.clone(), &self.download_base, &self.repo)
            .with_progress(self.progress.clone());
        let releases = ReleaseClient::with_client(client, &self.api_base, &self.repo);
        Ok(Install::new(releases, downloader).with_asset_name(&self.asset_name))
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// VersionApi
// ──────────────────────────────────────────────────────────────────────────────

/// Intermediate builder after a version strategy has been chosen.
pub struct VersionApi {
    api: Api,
    version: Option<String>,
}

impl VersionApi {
    /// Download the binary to `path`, make it executable and return a handle to it.
    pub async fn install(self, path: impl AsRef<Path>) -> Result<YtDlp> {
        let install = self.api.installer()?;
        match &self.version {
            Some(version) => install.install_version(path.as_ref(), version).await,
            None => install.install_latest(path.as_ref()).await,
        }
    }
}
