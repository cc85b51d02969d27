use std::path::Path;

use tracing::info;

use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::release::ReleaseClient;
use crate::runner::YtDlp;

/// Asset published with every yt-dlp release.
pub const ASSET_NAME: &str = "yt-dlp";

/// Installs a release asset as an executable file.
pub struct Install {
    releases: ReleaseClient,
    downloader: Downloader,
    asset_name: String,
}

impl Install {
    pub fn new(releases: ReleaseClient, downloader: Downloader) -> Self {
        Self {
            releases,
            downloader,
            asset_name: ASSET_NAME.to_owned(),
        }
    }

    /// Install a differently named asset (e.g. `yt-dlp_linux`).
    pub fn with_asset_name(mut self, asset_name: &str) -> Self {
        self.asset_name = asset_name.to_owned();
        self
    }

    /// Install the newest release at `path`.
    pub async fn install_latest(&self, path: &Path) -> Result<YtDlp> {
        let release = self.releases.latest().await?;
        info!(version = %release.tag, "resolved latest release");
        self.install_version(path, &release.tag).await
    }

    /// Download `version` to `path` and mark it executable.
    pub async fn install_version(&self, path: &Path, version: &str) -> Result<YtDlp> {
        let url = self.downloader.asset_url(version, &self.asset_name);
        self.downloader.download(&url, path).await?;
        set_exec_permission(path).await?;

        info!(%version, path = %path.display(), "installed");
        YtDlp::new(path)
    }
}

/// Add execute permission for owner, group and other, keeping every other bit.
pub async fn set_exec_permission(path: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| Error::Stat {
            path: path.to_owned(),
            source,
        })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        tokio::fs::set_permissions(path, permissions)
            .await
            .map_err(|source| Error::Permissions {
                path: path.to_owned(),
                source,
            })?;
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}
