use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::process::{Child, ChildStdout};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::handshake::{self, Verdict};
use crate::runner::{command_args, YtDlp};

/// Arguments for a launch that writes the media to stdout and reports progress one line at a time.
pub fn stream_args(target: &str, extra: &[&str]) -> Result<Vec<String>> {
    let mut args = command_args(target, extra)?;
    args.extend(["-o", "-", "--newline"].map(str::to_owned));
    Ok(args)
}

/// Capacity of the in-memory pipe behind [`YtDlp::execute_output_stream`].
const COMBINED_PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
enum Source {
    Stdout(ChildStdout),
    /// stdout and stderr merged by two forwarding tasks.
    Combined(DuplexStream),
}

/// Live output of a launched process.
///
/// Reads end when the process exits. The exit status itself is collected in
/// the background and can be awaited with [`exit_status`](Self::exit_status).
#[derive(Debug)]
pub struct MediaStream {
    source: Source,
    exit: Option<oneshot::Receiver<io::Result<ExitStatus>>>,
    kill: Option<oneshot::Sender<()>>,
    status: Option<ExitStatus>,
}

impl MediaStream {
    fn new(source: Source, child: Child) -> Self {
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(reap(child, exit_tx, kill_rx));
        Self {
            source,
            exit: Some(exit_rx),
            kill: Some(kill_tx),
            status: None,
        }
    }

    /// Ask the background reaper to kill the process. Does nothing if it was
    /// already asked or the process has exited.
    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            // The reaper is gone once the process has exited.
            let _ = kill.send(());
        }
    }

    /// Wait for the process to exit.
    ///
    /// An empty stderr is accepted as a successful start, so a clean exit
    /// code is the only confirmation that the payload is complete.
    pub async fn exit_status(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let exit = self
            .exit
            .take()
            .ok_or_else(|| Error::Wait(io::Error::other("exit status unavailable")))?;
        let status = exit
            .await
            .map_err(|_| Error::Wait(io::Error::other("reaper task ended early")))?
            .map_err(Error::Wait)?;
        self.status = Some(status);
        Ok(status)
    }
}

impl AsyncRead for MediaStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().source {
            Source::Stdout(stdout) => Pin::new(stdout).poll_read(cx, buf),
            Source::Combined(pipe) => Pin::new(pipe).poll_read(cx, buf),
        }
    }
}

/// A started process together with its handshake verdict.
///
/// The stream is present on every verdict; check [`verdict`](Self::verdict)
/// (or use [`into_result`](Self::into_result)) to learn whether it will carry
/// anything.
#[derive(Debug)]
pub struct StreamLaunch {
    pub stream: MediaStream,
    pub verdict: Verdict,
}

impl StreamLaunch {
    /// The stream if the launch started; otherwise the process is killed and
    /// the verdict becomes an error.
    pub fn into_result(mut self) -> Result<MediaStream> {
        let err = match self.verdict {
            Verdict::Started | Verdict::Unconfirmed => return Ok(self.stream),
            Verdict::Failed(message) => Error::Reported(message),
            Verdict::TimedOut(limit) => Error::HandshakeTimeout(limit),
        };
        self.stream.kill();
        Err(err)
    }
}

impl YtDlp {
    /// Start streaming `target` to stdout and wait for the handshake.
    ///
    /// Only a failure to spawn is returned as `Err`; what yt-dlp itself says
    /// is in the returned [`Verdict`]. A launch that times out is killed
    /// before it is returned.
    pub async fn launch_stream(&self, target: &str, extra: &[&str]) -> Result<StreamLaunch> {
        let args = stream_args(target, extra)?;
        let mut child = self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        debug!(pid = ?child.id(), "yt-dlp streaming");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.spawn_error(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| self.spawn_error(io::Error::other("stderr was not captured")))?;

        let mut stream = MediaStream::new(Source::Stdout(stdout), child);
        let verdict = handshake::watch(stderr, self.handshake_timeout).await;
        if let Verdict::TimedOut(_) = verdict {
            stream.kill();
        }
        Ok(StreamLaunch { stream, verdict })
    }

    /// Start streaming `target` and return stdout once yt-dlp has begun downloading.
    pub async fn execute_stream(&self, target: &str, extra: &[&str]) -> Result<MediaStream> {
        self.launch_stream(target, extra).await?.into_result()
    }

    /// Start yt-dlp on `target` and return everything it prints, stdout and
    /// stderr interleaved, without waiting for it to confirm anything.
    pub async fn execute_output_stream(&self, target: &str, extra: &[&str]) -> Result<MediaStream> {
        let args = command_args(target, extra)?;
        let mut child = self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        debug!(pid = ?child.id(), "yt-dlp output streaming");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.spawn_error(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| self.spawn_error(io::Error::other("stderr was not captured")))?;

        // The reader sees end-of-stream once both forwarders have dropped their handle.
        let (writer, reader) = tokio::io::duplex(COMBINED_PIPE_CAPACITY);
        let writer = Arc::new(Mutex::new(writer));
        tokio::spawn(forward(stdout, writer.clone()));
        tokio::spawn(forward(stderr, writer));

        Ok(MediaStream::new(Source::Combined(reader), child))
    }
}

async fn forward<R>(mut from: R, to: Arc<Mutex<DuplexStream>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0; 8 * 1024];
    loop {
        let n = match from.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "failed to read yt-dlp output");
                return;
            }
        };
        if let Err(e) = to.lock().await.write_all(&buf[..n]).await {
            // Reader dropped.
            trace!(error = %e, "output stream closed");
            return;
        }
    }
}

async fn reap(
    mut child: Child,
    exit_tx: oneshot::Sender<io::Result<ExitStatus>>,
    kill_rx: oneshot::Receiver<()>,
) {
    // A dropped kill sender does not match `Ok(())`, leaving only the wait.
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = kill_rx => {
            debug!(pid = ?child.id(), "killing yt-dlp");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill yt-dlp");
            }
            child.wait().await
        }
    };
    match &status {
        Ok(status) if status.success() => debug!(%status, "yt-dlp exited"),
        Ok(status) => warn!(%status, "yt-dlp exited"),
        Err(e) => warn!(error = %e, "failed to wait for yt-dlp"),
    }
    // Nobody may be listening.
    let _ = exit_tx.send(status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_flags_come_last() {
        let args = stream_args("https://example.com/v", &["-f", "bestaudio"]).unwrap();
        assert_eq!(
            args,
            ["https://example.com/v", "-f", "bestaudio", "-o", "-", "--newline"]
        );
    }

    #[test]
    fn empty_target_is_rejected() {
        assert!(matches!(stream_args("", &[]), Err(Error::EmptyTarget)));
    }
}
