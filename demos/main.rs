use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;
use ytdlp::{Api, ErrorKind, YtDlp};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let query = std::env::args().nth(1).unwrap_or_else(|| "rick astley".to_owned());

    // Use an existing install when there is one, otherwise fetch the latest release.
    let ytdlp = match YtDlp::new("./yt-dlp") {
        Ok(ytdlp) if ytdlp.path().exists() => ytdlp,
        _ => match Api::new().latest().install("./yt-dlp").await {
            Ok(ytdlp) => ytdlp,
            Err(e) => {
                eprintln!("error installing yt-dlp: {e}");
                return;
            }
        },
    };

    match ytdlp.version().await {
        Ok(version) => println!("yt-dlp {version}"),
        Err(e) if e.kind() == ErrorKind::NotInstalled => {
            eprintln!("yt-dlp is not installed at {}", ytdlp.path().display());
            return;
        }
        Err(e) => eprintln!("error reading version: {e}"),
    }

    let info = match ytdlp.video_info(&query).await {
        Ok(info) => info,
        Err(e) => {
            eprintln!("error looking up {query:?}: {e}");
            return;
        }
    };
    println!("{} [{}] {}s", info.title, info.id, info.duration);

    let mut stream = match ytdlp.execute_stream(&info.id, &["-f", "bestaudio"]).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("yt-dlp refused to stream: {e}");
            return;
        }
    };

    let mut audio = Vec::new();
    if let Err(e) = stream.read_to_end(&mut audio).await {
        eprintln!("error reading stream: {e}");
        return;
    }
    match stream.exit_status().await {
        Ok(status) if status.success() => println!("received {} bytes", audio.len()),
        Ok(status) => eprintln!("yt-dlp exited with {status} after {} bytes", audio.len()),
        Err(e) => eprintln!("error waiting for yt-dlp: {e}"),
    }
}
