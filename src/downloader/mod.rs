//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`orchestration`] - Running one job end-to-end and read paths
//! - [`progress`] - Engine progress to registry/event translation
//! - [`lifecycle`] - Shutdown coordination
//! - [`services`] - Background service starters and capability reporting

mod lifecycle;
mod orchestration;
mod progress;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::engine::{FetchEngine, UnavailableEngine, YtDlpEngine};
use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::storage::StorageArea;
use crate::types::Event;
use std::sync::Arc;

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped or cheap handles)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Job progress table shared with the progress endpoint
    pub(crate) registry: JobRegistry,
    /// Output directory
    pub(crate) storage: StorageArea,
    /// Fetch engine (trait object so tests and degraded deployments can swap it)
    pub(crate) engine: Arc<dyn FetchEngine>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancelled on shutdown; stops background services
    pub(crate) cancel_token: tokio_util::sync::CancellationToken,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// Locates yt-dlp (explicit `engine.yt_dlp_path` first, then PATH when
    /// `engine.search_path` is set). Without a binary the downloader still
    /// starts; download and info requests then fail with
    /// [`Error::ExternalTool`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///     let _sweeper = downloader.start_sweeper();
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: Config) -> Result<Self> {
        let engine: Arc<dyn FetchEngine> = match YtDlpEngine::from_config(&config.engine) {
            Some(engine) => Arc::new(engine),
            None => {
                tracing::warn!("yt-dlp not found, downloads will be rejected until it is installed");
                Arc::new(UnavailableEngine)
            }
        };

        Self::with_engine(config, engine).await
    }

    /// Create a MediaDownloader around an explicit engine
    pub async fn with_engine(config: Config, engine: Arc<dyn FetchEngine>) -> Result<Self> {
        let download_dir = config.download_dir();
        tokio::fs::create_dir_all(download_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    download_dir.display(),
                    e
                ),
            ))
        })?;
        let storage = StorageArea::new(download_dir.clone())?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            engine = engine.name(),
            engine_available = engine.is_available(),
            download_dir = %download_dir.display(),
            "Fetch engine initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            registry: JobRegistry::new(),
            storage,
            engine,
            event_tx,
            cancel_token: tokio_util::sync::CancellationToken::new(),
        })
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls more than 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Job registry handle
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Storage area handle
    pub fn storage(&self) -> &StorageArea {
        &self.storage
    }

    /// Emit an event to all subscribers; dropped silently when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
