//! Shared test helpers: a scripted fetch engine and downloader constructors.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::engine::{FetchEngine, FetchOutcome, ProgressEvent, ProgressListener};
use crate::format::FetchDirective;
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio::sync::Notify;

/// What the fake engine does on `fetch`
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Report `progress`, then write `<id>.<ext>` and succeed
    Succeed {
        ext: String,
        title: Option<String>,
        progress: Vec<f64>,
    },
    /// Report `progress`, then fail with the given message
    Fail { message: String, progress: Vec<f64> },
    /// Succeed without writing anything
    SucceedWithoutFile,
}

impl Script {
    pub(crate) fn succeed(ext: &str, title: &str) -> Self {
        Script::Succeed {
            ext: ext.to_string(),
            title: Some(title.to_string()),
            progress: vec![10.0, 55.5, 100.0],
        }
    }

    pub(crate) fn fail(message: &str) -> Self {
        Script::Fail {
            message: message.to_string(),
            progress: vec![3.0],
        }
    }
}

/// One recorded `fetch` call
#[derive(Clone, Debug)]
pub(crate) struct FetchCall {
    pub url: String,
    pub directive: FetchDirective,
    pub output_template: String,
}

/// Scripted engine that never touches the network
pub(crate) struct FakeEngine {
    script: Script,
    calls: Mutex<Vec<FetchCall>>,
    /// Notified once progress has been reported
    pub reached: Arc<Notify>,
    /// When set, `fetch` waits for a notification before finishing
    pub gate: Option<Arc<Notify>>,
}

impl FakeEngine {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
            reached: Arc::new(Notify::new()),
            gate: None,
        }
    }

    /// Pause every fetch after its progress reports until `gate` is notified
    pub(crate) fn gated(script: Script) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut engine = Self::new(script);
        engine.gate = Some(gate.clone());
        (engine, gate)
    }

    pub(crate) fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchEngine for FakeEngine {
    async fn probe(&self, url: &str) -> crate::Result<MediaInfo> {
        match &self.script {
            Script::Fail { message, .. } => Err(crate::Error::Engine(message.clone())),
            _ => Ok(MediaInfo {
                title: Some(format!("Info for {url}")),
                duration: Some(61.0),
                thumbnail: None,
                uploader: Some("fake".into()),
                formats: 4,
            }),
        }
    }

    async fn fetch(
        &self,
        url: &str,
        directive: &FetchDirective,
        output_template: &Path,
        listener: &dyn ProgressListener,
    ) -> crate::Result<FetchOutcome> {
        self.calls.lock().unwrap().push(FetchCall {
            url: url.to_string(),
            directive: directive.clone(),
            output_template: output_template.display().to_string(),
        });

        let progress = match &self.script {
            Script::Succeed { progress, .. } | Script::Fail { progress, .. } => progress.clone(),
            Script::SucceedWithoutFile => Vec::new(),
        };
        for percent in progress {
            listener.on_progress(ProgressEvent::Downloading {
                percent,
                speed: Some("1.00MiB/s".into()),
                eta: Some("00:01".into()),
            });
        }
        self.reached.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.script {
            Script::Succeed { ext, title, .. } => {
                listener.on_progress(ProgressEvent::Finished);
                let path = output_template.display().to_string().replace("%(ext)s", ext);
                tokio::fs::write(&path, b"fake media bytes").await?;
                Ok(FetchOutcome {
                    title: title.clone(),
                })
            }
            Script::Fail { message, .. } => Err(crate::Error::Engine(message.clone())),
            Script::SucceedWithoutFile => Ok(FetchOutcome::default()),
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Test config writing into `dir`
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.download_dir = dir.join("downloads");
    config
}

/// Downloader backed by `engine`; keep the tempdir alive for the test's duration
pub(crate) async fn create_test_downloader(
    engine: Arc<dyn FetchEngine>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let downloader = MediaDownloader::with_engine(test_config(temp_dir.path()), engine)
        .await
        .unwrap();
    (downloader, temp_dir)
}
