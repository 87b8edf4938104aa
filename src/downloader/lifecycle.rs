//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::MediaDownloader;

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// 1. Emits [`Event::Shutdown`]
    /// 2. Stops accepting new downloads ([`Error::ShuttingDown`](crate::Error::ShuttingDown))
    /// 3. Stops the retention sweeper, event streams and the API server started through this instance
    ///
    /// Downloads already running are left to finish on their request tasks.
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            tracing::debug!("Shutdown already in progress");
            return Ok(());
        }

        tracing::info!("Initiating graceful shutdown");
        // emitted first so event streams forward it before they stop
        self.emit_event(Event::Shutdown);
        self.cancel_token.cancel();

        tracing::info!(
            tracked_jobs = self.registry.len(),
            "Graceful shutdown complete"
        );
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token cancelled on shutdown, for callers tying their own tasks to it
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.cancel_token.clone()
    }
}
