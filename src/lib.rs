//! # media-dl
//!
//! HTTP service that downloads online media through yt-dlp and serves the
//! resulting files for a limited time.
//!
//! ## Overview
//!
//! - **Synchronous downloads** - `POST /api/download` answers once the file is stored
//! - **Pollable progress** - every job gets an id whose state can be queried while it runs
//! - **Bounded storage** - a background sweeper deletes files past their retention
//! - **Event-driven** - consumers can subscribe to job events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DownloadRequest, MediaDownloader, MediaKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = downloader
//!         .start_download(DownloadRequest::new(
//!             "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!             MediaKind::Audio,
//!             "best",
//!         ))
//!         .await?;
//!     println!("stored as {}", outcome.filename);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// yt-dlp process driver and output parsing
pub mod engine;
/// Error types
pub mod error;
/// Format resolution policy
pub mod format;
/// In-memory job progress table
pub mod registry;
/// Output directory management
pub mod storage;
/// Retention sweeper background task
pub mod sweeper;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use downloader::MediaDownloader;
pub use engine::{FetchEngine, UnavailableEngine, YtDlpEngine};
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use registry::JobRegistry;
pub use storage::{StorageArea, SweepReport};
pub use types::{
    Capabilities, DownloadOutcome, DownloadRequest, Event, InfoRequest, JobId, JobState,
    MediaInfo, MediaKind, Quality, Status,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{MediaDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default()).await?;
///     let _sweeper = downloader.start_sweeper();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
