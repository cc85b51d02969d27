use std::time::Duration;

use reqwest::{Client, Proxy};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default GitHub REST endpoint.
pub const GITHUB_API: &str = "https://api.github.com";
/// Repository that publishes yt-dlp builds.
pub const REPO: &str = "yt-dlp/yt-dlp";
/// Total timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One published release of the tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    #[serde(rename = "tag_name")]
    pub tag: String,
}

/// How HTTP requests reach the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Whatever reqwest picks up from the environment.
    #[default]
    System,
    /// Send everything through this proxy URL.
    Url(String),
    /// Connect directly.
    Direct,
}

/// Build an HTTP client with a total request timeout, optionally with proxy support.
pub(crate) fn http_client(timeout: Duration, proxy: &ProxyConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ytdlp/", env!("CARGO_PKG_VERSION")));
    match proxy {
        ProxyConfig::System => {}
        ProxyConfig::Url(proxy_url) => {
            builder = builder.proxy(Proxy::all(proxy_url.as_str()).map_err(Error::Client)?);
        }
        ProxyConfig::Direct => builder = builder.no_proxy(),
    }
    builder.build().map_err(Error::Client)
}

/// Lists releases from the GitHub API.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: Client,
    api_base: String,
    repo: String,
}

impl ReleaseClient {
    /// Client against the public GitHub API for `yt-dlp/yt-dlp`.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(
            http_client(timeout, &ProxyConfig::System)?,
            GITHUB_API,
            REPO,
        ))
    }

    /// Client with an explicit HTTP client, API base URL and `owner/repo`.
    pub fn with_client(client: Client, api_base: &str, repo: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            repo: repo.to_owned(),
        }
    }

    pub fn releases_url(&self) -> String {
        format!("{}/repos/{}/releases", self.api_base, self.repo)
    }

    /// Fetch one page of releases, newest first as GitHub orders them.
    pub async fn releases(&self, page: u32, per_page: u32) -> Result<Vec<Release>> {
        if page == 0 {
            return Err(Error::InvalidArgument("page must be positive"));
        }
        if per_page == 0 {
            return Err(Error::InvalidArgument("per_page must be positive"));
        }

        let url = format!("{}?page={page}&per_page={per_page}", self.releases_url());
        debug!(%url, "listing releases");
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(Error::Status {
                url,
                status: resp.status(),
            });
        }

        let body = resp.bytes().await.map_err(|source| Error::Request {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(Error::ReleaseDecode)
    }

    /// The most recent release.
    pub async fn latest(&self) -> Result<Release> {
        self.releases(1, 1)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoReleases)
    }
}
