use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the crate reports, grouped by the phase that produced it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid binary path")]
    InvalidBinaryPath,

    #[error("empty target")]
    EmptyTarget,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("failed to start {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for yt-dlp: {0}")]
    Wait(#[source] io::Error),

    /// The tool ran and exited unsuccessfully. `output` holds everything it
    /// printed, stdout first.
    #[error("yt-dlp error: {status} | {output}")]
    Execution { status: ExitStatus, output: String },

    #[error("failed to decode video info: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to decode release listing: {0}")]
    ReleaseDecode(#[source] serde_json::Error),

    #[error("no releases found")]
    NoReleases,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set permissions on {}: {source}", path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// yt-dlp printed an `ERROR: ` line before any download progress. The
    /// message is the tool's own text with the prefix removed.
    #[error("{0}")]
    Reported(String),

    #[error("yt-dlp produced no progress or error within {0:?}")]
    HandshakeTimeout(Duration),
}

/// Coarse classification of an [`Error`], for callers that only need to know
/// which side of the system failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing was spawned or requested.
    Validation,
    /// The binary does not exist at the configured path.
    NotInstalled,
    /// The binary exists but could not be started.
    Spawn,
    /// The tool ran and failed.
    Execution,
    /// The tool (or GitHub) answered with output that could not be parsed.
    Decode,
    Network,
    Filesystem,
    /// A streaming launch was rejected during its startup handshake.
    Handshake,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBinaryPath | Self::EmptyTarget | Self::InvalidArgument(_) => {
                ErrorKind::Validation
            }
            Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotInstalled
            }
            Self::Spawn { .. } => ErrorKind::Spawn,
            Self::Wait(_) | Self::Execution { .. } => ErrorKind::Execution,
            Self::Decode(_) | Self::ReleaseDecode(_) => ErrorKind::Decode,
            Self::NoReleases | Self::Client(_) | Self::Request { .. } | Self::Status { .. } => {
                ErrorKind::Network
            }
            Self::Create { .. } | Self::Copy { .. } | Self::Stat { .. } | Self::Permissions { .. } => {
                ErrorKind::Filesystem
            }
            Self::Reported(_) | Self::HandshakeTimeout(_) => ErrorKind::Handshake,
        }
    }
}
