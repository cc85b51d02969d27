//! # ytdlp
//!
//! Install the [yt-dlp](https://github.com/yt-dlp/yt-dlp) command-line tool
//! from its GitHub releases, run it, and stream media from it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tokio::io::AsyncReadExt;
//! use ytdlp::{Api, YtDlp};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ytdlp: YtDlp = Api::new().latest().install("./yt-dlp").await?;
//!
//!     let info = ytdlp.video_info("rust lang").await?;
//!     println!("{} ({}s)", info.title, info.duration);
//!
//!     let mut stream = ytdlp.execute_stream(&info.id, &["-f", "bestaudio"]).await?;
//!     let mut audio = Vec::new();
//!     stream.read_to_end(&mut audio).await?;
//!     stream.exit_status().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod downloader;
pub mod error;
pub mod handshake;
pub mod info;
pub mod install;
pub mod progress;
pub mod release;
pub mod runner;
pub mod stream;

pub use api::{Api, VersionApi};
pub use downloader::{Downloader, ProgressFn};
pub use error::{Error, ErrorKind, Result};
pub use handshake::Verdict;
pub use info::VideoInfo;
pub use install::Install;
pub use release::{ProxyConfig, Release, ReleaseClient};
pub use runner::{Captured, YtDlp};
pub use stream::{MediaStream, StreamLaunch};
