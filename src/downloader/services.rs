//! Background service starters and capability reporting.

use crate::error::Result;
use crate::sweeper::{self, SweeperSettings};
use crate::types::Capabilities;
use std::sync::Arc;

use super::MediaDownloader;

impl MediaDownloader {
    /// Start the retention sweeper; it stops on [`shutdown`](Self::shutdown)
    pub fn start_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let handle = sweeper::spawn_retention_sweeper(
            self.storage.clone(),
            self.registry.clone(),
            SweeperSettings::from_config(&self.config),
            self.event_tx.clone(),
            self.cancel_token.child_token(),
        );

        tracing::info!("Retention sweeper background task started");
        handle
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on `server.api.bind_address` (default 0.0.0.0:5000)
    /// and stops accepting connections on [`shutdown`](Self::shutdown).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }

    /// Query what the running service can do
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            engine: self.engine.name().to_string(),
            engine_available: self.engine.is_available(),
            download_dir: self.storage.dir().display().to_string(),
            retention_secs: self.config.storage.retention.as_secs(),
        }
    }
}
