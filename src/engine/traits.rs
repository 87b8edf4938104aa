//! Traits and types shared by fetch engine implementations

use crate::format::FetchDirective;
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::path::Path;

/// Progress signal reported by an engine while a fetch runs
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Raw transfer in progress
    Downloading {
        /// Percent of the current stream transferred
        percent: f64,
        /// Human-readable transfer speed, if known
        speed: Option<String>,
        /// Human-readable time remaining, if known
        eta: Option<String>,
    },
    /// Raw transfer done, post-processing (merge/transcode) started
    Finished,
}

/// Receiver of engine progress
///
/// Called synchronously from whatever task or thread the engine uses to
/// watch the transfer; implementations must not block.
pub trait ProgressListener: Send + Sync {
    /// Handle one progress signal
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Result of a successful fetch
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Media title, if the engine reported one
    pub title: Option<String>,
}

/// Media fetch engine
///
/// # Errors
///
/// Implementations return [`Error::Engine`](crate::Error::Engine) for
/// failures of the extraction itself (unsupported site, network, geo
/// restriction, transcoding) with the engine's message, and
/// [`Error::ExternalTool`](crate::Error::ExternalTool) when the engine
/// cannot be run at all.
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Read metadata for `url` without downloading
    async fn probe(&self, url: &str) -> crate::Result<MediaInfo>;

    /// Download `url` according to `directive`
    ///
    /// `output_template` is a path whose file name contains `%(ext)s`; the
    /// engine substitutes the final extension. Progress is reported through
    /// `listener` until this call returns.
    async fn fetch(
        &self,
        url: &str,
        directive: &FetchDirective,
        output_template: &Path,
        listener: &dyn ProgressListener,
    ) -> crate::Result<FetchOutcome>;

    /// Whether the engine can currently be invoked
    fn is_available(&self) -> bool;

    /// Human-readable name for logging and capability reporting
    fn name(&self) -> &'static str;
}
