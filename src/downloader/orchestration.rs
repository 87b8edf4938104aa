//! Running one job end-to-end, plus the read paths used by the API.

use crate::error::{Error, Result};
use crate::format;
use crate::storage::StoredFile;
use crate::types::{
    DownloadOutcome, DownloadRequest, Event, JobId, JobState, MediaInfo, Quality,
};

use super::MediaDownloader;
use super::progress::RegistryProgress;

/// Title reported when the engine does not provide one
const DEFAULT_TITLE: &str = "download";

impl MediaDownloader {
    /// Download `request.url` and wait for the stored file
    ///
    /// The job is visible to [`progress`](Self::progress) from the moment it
    /// is created until the call returns (and afterwards, until pruned).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`]: empty URL or unparsable quality; no job is created
    /// - [`Error::ShuttingDown`]: [`shutdown`](Self::shutdown) was called; no job is created
    /// - [`Error::Engine`]: the engine's own failure message
    /// - [`Error::ExternalTool`]: yt-dlp could not be run
    /// - [`Error::OutputMissing`]: the engine succeeded but no file was found
    ///
    /// Every error after job creation also marks the job `failed`.
    pub async fn start_download(&self, request: DownloadRequest) -> Result<DownloadOutcome> {
        let url = validated_url(request.url.as_deref())?;
        let quality: Quality = request.quality.parse()?;
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let id = JobId::new();
        let host = url_host(url);
        self.registry.create(id);
        self.emit_event(Event::Started {
            id,
            host: host.clone(),
        });
        tracing::info!(
            download_id = %id,
            host = host.as_deref().unwrap_or("-"),
            kind = %request.kind,
            %quality,
            "download started"
        );

        let directive = format::resolve(request.kind, &quality, &self.config.engine);
        let listener = RegistryProgress::new(id, self.registry.clone(), self.event_tx.clone());
        let output_template = self.storage.output_template(id);

        let outcome = match self
            .engine
            .fetch(url, &directive, &output_template, &listener)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail_job(id, e)),
        };

        let path = match self.storage.discover(id, &directive.extension).await {
            Ok(Some(path)) => path,
            Ok(None) => return Err(self.fail_job(id, Error::OutputMissing { id })),
            Err(e) => return Err(self.fail_job(id, e)),
        };

        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
            return Err(self.fail_job(id, Error::OutputMissing { id }));
        };
        let title = outcome
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        self.registry.mark_completed(id, filename.clone(), title.clone());
        self.emit_event(Event::Completed {
            id,
            filename: filename.clone(),
            title: title.clone(),
        });
        tracing::info!(download_id = %id, %filename, "download completed");

        Ok(DownloadOutcome {
            success: true,
            download_id: id,
            filename,
            title,
        })
    }

    /// Current state of a job
    ///
    /// Unparsable and unknown ids both yield the `not_found` sentinel.
    pub fn progress(&self, download_id: &str) -> JobState {
        match download_id.trim().parse::<JobId>() {
            Ok(id) => self.registry.get(id),
            Err(_) => JobState::not_found(),
        }
    }

    /// Read media metadata without downloading
    pub async fn probe(&self, url: Option<&str>) -> Result<MediaInfo> {
        let url = validated_url(url)?;
        tracing::debug!(host = url_host(url).as_deref().unwrap_or("-"), "probing media");
        self.engine.probe(url).await
    }

    /// Open a stored file by name for streaming
    pub async fn open_file(&self, filename: &str) -> Result<StoredFile> {
        self.storage.open(filename).await
    }

    fn fail_job(&self, id: JobId, error: Error) -> Error {
        let message = error.to_string();
        tracing::error!(download_id = %id, error = %message, "download failed");
        self.registry.mark_failed(id, message.clone());
        self.emit_event(Event::Failed { id, error: message });
        error
    }
}

fn validated_url(url: Option<&str>) -> Result<&str> {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(Error::InvalidRequest("URL is required".into())),
    }
}

/// Host part of a URL; logs and events carry only this
fn url_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}
