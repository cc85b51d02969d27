/// Integration tests against a local mock of GitHub and `/bin/sh` standing in for yt-dlp.
///
/// One test makes real network requests to GitHub.
/// Run with `cargo test -- --include-ignored` to include it.
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use ytdlp::{Api, Error, ErrorKind};

    fn mock_api(server: &MockServer) -> Api {
        Api::new()
            .no_progress()
            .no_proxy()
            .set_api_base(&server.base_url())
            .set_download_base(&server.base_url())
    }

    #[tokio::test]
    async fn releases_keep_remote_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/yt-dlp/yt-dlp/releases")
                    .query_param("page", "2")
                    .query_param("per_page", "3");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        r#"[{"tag_name":"2025.03.01","name":"c"},
                            {"tag_name":"2025.01.01"},
                            {"tag_name":"2025.02.01"}]"#,
                    );
            })
            .await;

        let releases = mock_api(&server).releases(2, 3).await.unwrap();
        let tags: Vec<_> = releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, ["2025.03.01", "2025.01.01", "2025.02.01"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn zero_page_is_rejected_without_a_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/yt-dlp/yt-dlp/releases");
                then.status(200).body("[]");
            })
            .await;

        let api = mock_api(&server);
        assert!(matches!(api.releases(0, 1).await, Err(Error::InvalidArgument(_))));
        assert!(matches!(api.releases(1, 0).await, Err(Error::InvalidArgument(_))));
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn malformed_listing_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/yt-dlp/yt-dlp/releases");
                then.status(200).body(r#"{"message":"not a list"}"#);
            })
            .await;

        let err = mock_api(&server).releases(1, 1).await.unwrap_err();
        assert!(matches!(err, Error::ReleaseDecode(_)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn rate_limited_listing_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/yt-dlp/yt-dlp/releases");
                then.status(403).body(r#"{"message":"API rate limit exceeded"}"#);
            })
            .await;

        let err = mock_api(&server).releases(1, 1).await.unwrap_err();
        assert!(matches!(err, Error::Status { status, .. } if status.as_u16() == 403));
    }

    #[tokio::test]
    async fn slow_server_hits_the_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/yt-dlp/yt-dlp/releases");
                then.status(200).delay(Duration::from_secs(3)).body("[]");
            })
            .await;

        let err = mock_api(&server)
            .set_timeout(Duration::from_millis(200))
            .releases(1, 1)
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Request { source, .. } if source.is_timeout()), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn install_latest_without_releases_fails_cleanly() {
        let server = MockServer::start_async().await;
        let listing = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/yt-dlp/yt-dlp/releases")
                    .query_param("page", "1")
                    .query_param("per_page", "1");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("[]");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("yt-dlp");
        let err = mock_api(&server).latest().install(&target).await.unwrap_err();

        assert!(matches!(err, Error::NoReleases), "{err:?}");
        assert!(!target.exists());
        listing.assert_async().await;
    }

    #[tokio::test]
    async fn install_latest_downloads_the_newest_tag() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/yt-dlp/yt-dlp/releases");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"[{"tag_name":"2025.06.30"}]"#);
            })
            .await;
        let asset = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/yt-dlp/yt-dlp/releases/download/2025.06.30/yt-dlp");
                then.status(200).body("#!/bin/sh\necho 2025.06.30\n");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("yt-dlp");
        let ytdlp = mock_api(&server).latest().install(&target).await.unwrap();

        asset.assert_async().await;
        assert_eq!(ytdlp.path(), target);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "#!/bin/sh\necho 2025.06.30\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn install_adds_exec_bits_and_keeps_the_rest() {
        use std::os::unix::fs::PermissionsExt;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/yt-dlp/yt-dlp/releases/download/2024.12.13/yt-dlp");
                then.status(200).body("binary");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("yt-dlp");
        std::fs::write(&target, "old").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o604)).unwrap();

        mock_api(&server)
            .version("2024.12.13")
            .install(&target)
            .await
            .unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o604 | 0o111);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "binary");
    }

    #[tokio::test]
    async fn install_with_custom_asset_name() {
        let server = MockServer::start_async().await;
        let asset = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/yt-dlp/yt-dlp/releases/download/2024.12.13/yt-dlp_linux");
                then.status(200).body("linux build");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        mock_api(&server)
            .set_asset_name("yt-dlp_linux")
            .version("2024.12.13")
            .install(dir.path().join("yt-dlp"))
            .await
            .unwrap();
        asset.assert_async().await;
    }

    #[tokio::test]
    async fn missing_asset_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/yt-dlp/yt-dlp/releases/download/0.0.0/yt-dlp");
                then.status(404);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = mock_api(&server)
            .version("0.0.0")
            .install(dir.path().join("yt-dlp"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status, .. } if status.as_u16() == 404));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn failed_download_keeps_the_existing_binary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/yt-dlp/yt-dlp/releases/download/9.9/yt-dlp");
                then.status(404);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("yt-dlp");
        std::fs::write(&target, "working build").unwrap();

        let err = mock_api(&server)
            .version("9.9")
            .install(&target)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Status { .. }), "{err:?}");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "working build");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, ["yt-dlp"]);
    }

    #[tokio::test]
    async fn unwritable_target_fails_before_downloading() {
        let server = MockServer::start_async().await;
        let asset = server
            .mock_async(|when, then| {
                when.method(GET).path("/yt-dlp/yt-dlp/releases/download/1.0/yt-dlp");
                then.status(200).body("binary");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing-dir").join("yt-dlp");
        let err = mock_api(&server)
            .version("1.0")
            .install(&target)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Create { .. }), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        asset.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn progress_reports_completion() {
        use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
        use std::sync::Arc;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/yt-dlp/yt-dlp/releases/download/1.0/yt-dlp");
                then.status(200).body("0123456789");
            })
            .await;

        let bytes = Arc::new(AtomicU64::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let progress: ytdlp::ProgressFn = {
            let bytes = bytes.clone();
            let finished = finished.clone();
            Arc::new(move |_src: &str, current: u64, _total: u64, _rate: f64, complete: bool| {
                bytes.store(current, Ordering::SeqCst);
                if complete {
                    finished.store(true, Ordering::SeqCst);
                }
            })
        };

        let dir = tempfile::tempdir().unwrap();
        mock_api(&server)
            .set_progress(progress)
            .version("1.0")
            .install(dir.path().join("yt-dlp"))
            .await
            .unwrap();

        assert_eq!(bytes.load(Ordering::SeqCst), 10);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn asset_url_by_version() {
        let dl = ytdlp::Downloader::new(reqwest::Client::new(), "https://github.com", "yt-dlp/yt-dlp");
        assert_eq!(
            dl.asset_url("2024.12.13", "yt-dlp"),
            "https://github.com/yt-dlp/yt-dlp/releases/download/2024.12.13/yt-dlp"
        );
    }

    /// Installs the real latest release from GitHub.
    #[tokio::test]
    #[ignore = "requires network access and downloads a large file"]
    async fn test_install_latest_from_github() {
        let dir = tempfile::tempdir().unwrap();
        let result = Api::new()
            .set_timeout(Duration::from_secs(120))
            .latest()
            .install(dir.path().join("yt-dlp"))
            .await;

        assert!(result.is_ok(), "error installing yt-dlp: {:?}", result);
    }
}
