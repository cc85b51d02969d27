use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::info::{VideoInfo, INFO_TEMPLATE};

/// Handle to a yt-dlp executable.
///
/// Only the path is checked when the handle is built. Whether the file exists
/// and is executable shows up when a command is run.
#[derive(Debug, Clone)]
pub struct YtDlp {
    path: PathBuf,
    pub(crate) handshake_timeout: Option<Duration>,
}

/// Everything a finished run printed, with its exit status.
#[derive(Debug, Clone)]
pub struct Captured {
    pub status: ExitStatus,
    /// stdout followed by stderr.
    pub output: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// The output on success, or an [`Error::Execution`] carrying it.
    pub fn into_result(self) -> Result<String> {
        if self.status.success() {
            Ok(self.output)
        } else {
            Err(Error::Execution {
                status: self.status,
                output: self.output,
            })
        }
    }
}

/// `[target] ++ extra`. The target may not be empty; extra arguments pass through untouched.
pub fn command_args(target: &str, extra: &[&str]) -> Result<Vec<String>> {
    if target.is_empty() {
        return Err(Error::EmptyTarget);
    }
    let mut args = Vec::with_capacity(extra.len() + 1);
    args.push(target.to_owned());
    args.extend(extra.iter().map(|arg| (*arg).to_owned()));
    Ok(args)
}

/// Search for `query` and print the first hit's metadata as one JSON object, without downloading.
pub fn info_args(query: &str) -> Result<Vec<String>> {
    if query.is_empty() {
        return Err(Error::EmptyTarget);
    }
    Ok(vec![
        format!("ytsearch:{query}"),
        "-s".to_owned(),
        "-O".to_owned(),
        INFO_TEMPLATE.to_owned(),
    ])
}

impl YtDlp {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidBinaryPath);
        }
        Ok(Self {
            path,
            handshake_timeout: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up on a streaming launch when no `[download]` or `ERROR: ` line
    /// arrives within `timeout` of the launch. Other stderr output does not
    /// extend the limit. The process is killed when the limit is hit.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Run yt-dlp on `target` and wait for it to finish.
    pub async fn execute(&self, target: &str, extra: &[&str]) -> Result<()> {
        let args = command_args(target, extra)?;
        self.run(&args).await?.into_result().map(|_| ())
    }

    /// Like [`execute`](Self::execute), but hands back the output and exit
    /// status whether or not the run succeeded.
    pub async fn execute_capture(&self, target: &str, extra: &[&str]) -> Result<Captured> {
        let args = command_args(target, extra)?;
        self.run(&args).await
    }

    /// Look up the first search result for `query`.
    pub async fn video_info(&self, query: &str) -> Result<VideoInfo> {
        let args = info_args(query)?;
        let output = self.output(&args).await?;
        if !output.status.success() {
            return Err(Error::Execution {
                status: output.status,
                output: combined(&output),
            });
        }
        VideoInfo::from_json(&String::from_utf8_lossy(&output.stdout))
    }

    /// The version string the binary reports.
    pub async fn version(&self) -> Result<String> {
        let captured = self.run(&["--version".to_owned()]).await?;
        let output = captured.into_result()?;
        Ok(output.lines().next().unwrap_or_default().trim().to_owned())
    }

    pub(crate) fn command(&self, args: &[String]) -> Command {
        debug!(binary = %self.path.display(), ?args, "running yt-dlp");
        let mut cmd = Command::new(&self.path);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }

    pub(crate) fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            binary: self.path.clone(),
            source,
        }
    }

    async fn output(&self, args: &[String]) -> Result<Output> {
        let output = self
            .command(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        debug!(status = %output.status, "yt-dlp exited");
        Ok(output)
    }

    async fn run(&self, args: &[String]) -> Result<Captured> {
        let output = self.output(args).await?;
        Ok(Captured {
            status: output.status,
            output: combined(&output),
        })
    }
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
