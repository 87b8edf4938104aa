//! Stand-in engine used when yt-dlp cannot be located

use super::traits::{FetchEngine, FetchOutcome, ProgressListener};
use crate::format::FetchDirective;
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::path::Path;

const MISSING: &str = "yt-dlp is not available. \
     Install it, put it in PATH, or set engine.yt_dlp_path in config.";

/// Engine that rejects every request with [`Error::ExternalTool`](crate::Error::ExternalTool)
///
/// Lets the service start and answer health checks without yt-dlp;
/// download and info requests fail with 500 and this message instead.
///
/// # Examples
///
/// ```
/// use media_dl::engine::{FetchEngine, UnavailableEngine};
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = UnavailableEngine;
/// assert!(!engine.is_available());
/// assert!(engine.probe("https://example.com/v").await.is_err());
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEngine;

#[async_trait]
impl FetchEngine for UnavailableEngine {
    async fn probe(&self, _url: &str) -> crate::Result<MediaInfo> {
        Err(crate::Error::ExternalTool(MISSING.into()))
    }

    async fn fetch(
        &self,
        _url: &str,
        _directive: &FetchDirective,
        _output_template: &Path,
        _listener: &dyn ProgressListener,
    ) -> crate::Result<FetchOutcome> {
        Err(crate::Error::ExternalTool(MISSING.into()))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
