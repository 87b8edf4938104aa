//! Scripted fetch engine and downloader/server constructors

use async_trait::async_trait;
use media_dl::engine::{FetchEngine, FetchOutcome, ProgressEvent, ProgressListener};
use media_dl::format::FetchDirective;
use media_dl::{Config, MediaDownloader, MediaInfo};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Bytes every scripted download writes
pub const MEDIA_BYTES: &[u8] = b"scripted media payload";

/// Engine that reports a few progress steps, then writes `MEDIA_BYTES`
///
/// URLs containing `fail` produce an engine error instead.
pub struct ScriptedEngine {
    /// Pause between progress reports
    pub step_delay: Duration,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            step_delay: Duration::from_millis(0),
        }
    }

    pub fn slow(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

#[async_trait]
impl FetchEngine for ScriptedEngine {
    async fn probe(&self, url: &str) -> media_dl::Result<MediaInfo> {
        if url.contains("fail") {
            return Err(media_dl::Error::Engine(format!("ERROR: cannot probe {url}")));
        }
        Ok(MediaInfo {
            title: Some("Scripted clip".into()),
            duration: Some(12.5),
            thumbnail: Some("https://img.example/thumb.jpg".into()),
            uploader: Some("scripted".into()),
            formats: 7,
        })
    }

    async fn fetch(
        &self,
        url: &str,
        directive: &FetchDirective,
        output_template: &Path,
        listener: &dyn ProgressListener,
    ) -> media_dl::Result<FetchOutcome> {
        for percent in [5.0, 40.0, 80.0, 100.0] {
            listener.on_progress(ProgressEvent::Downloading {
                percent,
                speed: Some("2.00MiB/s".into()),
                eta: Some("00:02".into()),
            });
            tokio::time::sleep(self.step_delay).await;
        }

        if url.contains("fail") {
            return Err(media_dl::Error::Engine(format!(
                "ERROR: [generic] Unsupported URL: {url}"
            )));
        }

        listener.on_progress(ProgressEvent::Finished);
        let path = output_template
            .display()
            .to_string()
            .replace("%(ext)s", &directive.extension);
        tokio::fs::write(&path, MEDIA_BYTES).await?;

        Ok(FetchOutcome {
            title: Some("Scripted clip".into()),
        })
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config writing into `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.download_dir = temp_dir.path().join("downloads");
    config
}

/// Downloader backed by `engine` (keep temp_dir alive for test duration)
pub async fn create_test_downloader(
    engine: impl FetchEngine + 'static,
) -> (Arc<MediaDownloader>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let downloader = MediaDownloader::with_engine(test_config(&temp_dir), Arc::new(engine))
        .await
        .unwrap();
    (Arc::new(downloader), temp_dir)
}

/// A router served on an ephemeral localhost port
pub struct TestServer {
    pub addr: SocketAddr,
    pub downloader: Arc<MediaDownloader>,
    pub handle: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start(engine: impl FetchEngine + 'static) -> Self {
        let (downloader, temp_dir) = create_test_downloader(engine).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = media_dl::api::create_router(downloader.clone(), downloader.get_config());
        let shutdown = downloader.shutdown_token();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .unwrap();
        });

        Self {
            addr,
            downloader,
            handle,
            _temp_dir: temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}
