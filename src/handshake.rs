//! Startup handshake for streaming launches.
//!
//! yt-dlp writes human-readable progress to stderr and the media payload to
//! stdout. The first `[download]` line on stderr means payload bytes are on
//! their way; an `ERROR: ` line before that means they never will be. Anything
//! else (warnings, extractor chatter) is passed over.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

const DOWNLOAD_PREFIX: &str = "[download]";
const ERROR_PREFIX: &str = "ERROR: ";
/// Longest stderr line kept in memory; the rest of a longer line is skipped.
const MAX_LINE: usize = 64 * 1024;

/// What a single stderr line says about the launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<'a> {
    /// Download progress: the payload has started.
    Download,
    /// The tool gave up; carries the message without its prefix.
    Error(&'a str),
    Other,
}

impl<'a> Signal<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.starts_with(DOWNLOAD_PREFIX) {
            Signal::Download
        } else if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
            Signal::Error(message)
        } else {
            Signal::Other
        }
    }
}

/// Outcome of a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A `[download]` line was seen.
    Started,
    /// An `ERROR: ` line was seen first.
    Failed(String),
    /// stderr closed without either marker. Treated as started.
    Unconfirmed,
    /// Nothing decisive arrived within the configured limit.
    TimedOut(Duration),
}

impl Verdict {
    pub fn is_started(&self) -> bool {
        matches!(self, Verdict::Started | Verdict::Unconfirmed)
    }
}

/// Scan `stderr` in a background task and wait for the first verdict.
///
/// The task keeps reading stderr to end-of-stream after the verdict is sent,
/// so the child never stalls on a full stderr pipe once the caller has moved on.
pub async fn watch<R>(stderr: R, timeout: Option<Duration>) -> Verdict
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(scan(stderr, tx));

    let received = match timeout {
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(received) => received,
            Err(_) => {
                warn!(?limit, "handshake timed out");
                return Verdict::TimedOut(limit);
            }
        },
        None => rx.await,
    };

    // The sender only disappears if the scan task died before deciding.
    let verdict = received.unwrap_or(Verdict::Unconfirmed);
    debug!(?verdict, "handshake resolved");
    verdict
}

async fn scan<R>(stderr: R, tx: oneshot::Sender<Verdict>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();

    let verdict = loop {
        match next_line(&mut reader, &mut buf).await {
            Some(line) => match Signal::classify(&line) {
                Signal::Download => break Verdict::Started,
                Signal::Error(message) => break Verdict::Failed(message.to_owned()),
                Signal::Other => trace!(%line, "stderr"),
            },
            None => break Verdict::Unconfirmed,
        }
    };

    // Receiver may have timed out already.
    let _ = tx.send(verdict);

    while let Some(line) = next_line(&mut reader, &mut buf).await {
        trace!(%line, "stderr");
    }
}

/// Read one line without its terminator, cut at [`MAX_LINE`] bytes. `None` at
/// end-of-stream or on a read error.
async fn next_line<R>(reader: &mut BufReader<R>, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(MAX_LINE as u64)
        .read_until(b'\n', buf)
        .await;
    match read {
        Ok(0) => None,
        Ok(n) => {
            if n == MAX_LINE && buf.last() != Some(&b'\n') {
                debug!(limit = MAX_LINE, "truncating long stderr line");
                skip_line(reader).await;
            }
            let line = String::from_utf8_lossy(buf);
            Some(line.trim_end_matches(['\n', '\r']).to_owned())
        }
        Err(e) => {
            warn!(error = %e, "failed to read stderr");
            None
        }
    }
}

/// Discard input up to and including the next newline.
async fn skip_line<R>(reader: &mut BufReader<R>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let (consumed, done) = match reader.fill_buf().await {
            Ok([]) => return,
            Ok(available) => match available.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            },
            Err(e) => {
                warn!(error = %e, "failed to read stderr");
                return;
            }
        };
        reader.consume(consumed);
        if done {
            return;
        }
    }
}
