//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Error;

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random (v4) identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Accepted, engine not yet reporting
    Starting,
    /// Raw transfer in progress
    Downloading,
    /// Transfer finished, engine post-processing (merge/transcode)
    Processing,
    /// Output file confirmed on disk
    Completed,
    /// Terminal failure
    Failed,
    /// Unknown or expired id (query-time only, never stored)
    NotFound,
}

impl Status {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

/// Progress and result state of a job, as served by the progress endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobState {
    /// Current lifecycle status
    pub status: Status,

    /// Progress in [0, 100]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,

    /// Engine-reported transfer speed, only while downloading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Engine-reported time remaining, only while downloading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,

    /// Stored file name, once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Media title, once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Failure message, once failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Last time any field changed
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl JobState {
    /// Initial state of a freshly registered job
    pub fn starting() -> Self {
        Self {
            status: Status::Starting,
            percent: Some(0.0),
            speed: None,
            eta: None,
            filename: None,
            title: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Sentinel returned for ids the registry does not know
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            percent: None,
            speed: None,
            eta: None,
            filename: None,
            title: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Partial update merged into a [`JobState`]; `None` fields are left untouched
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobUpdate {
    /// New status
    pub status: Option<Status>,
    /// New percent
    pub percent: Option<f64>,
    /// New speed string
    pub speed: Option<String>,
    /// New eta string
    pub eta: Option<String>,
    /// Stored file name
    pub filename: Option<String>,
    /// Media title
    pub title: Option<String>,
    /// Failure message
    pub error: Option<String>,
}

/// Requested media kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video with merged audio
    #[default]
    Video,
    /// Audio only, transcoded
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Requested video quality
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Quality {
    /// Best available streams
    #[default]
    Best,
    /// Best streams no taller than the given height in pixels
    MaxHeight(u32),
}

impl std::str::FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("best") {
            return Ok(Quality::Best);
        }

        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);

        match digits.parse::<u32>() {
            Ok(height) if height > 0 => Ok(Quality::MaxHeight(height)),
            _ => Err(Error::InvalidRequest(format!(
                "invalid quality {s:?}: expected \"best\" or a height such as \"720\""
            ))),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Best => write!(f, "best"),
            Quality::MaxHeight(h) => write!(f, "{h}"),
        }
    }
}

fn default_quality() -> String {
    "best".to_string()
}

/// Accepts `"720"` as well as a bare JSON number `720`
fn quality_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Body of `POST /api/download`
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Media page URL (required)
    #[serde(default)]
    pub url: Option<String>,

    /// "video" (default) or "audio"
    #[serde(default, rename = "type")]
    pub kind: MediaKind,

    /// "best" (default) or a maximum height such as "720"
    #[serde(
        default = "default_quality",
        deserialize_with = "quality_from_string_or_number"
    )]
    pub quality: String,
}

impl DownloadRequest {
    /// Convenience constructor
    pub fn new(url: impl Into<String>, kind: MediaKind, quality: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            kind,
            quality: quality.into(),
        }
    }
}

/// Successful result of a download, returned synchronously to the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadOutcome {
    /// Always true
    pub success: bool,
    /// Job identifier usable with the progress endpoint
    pub download_id: JobId,
    /// Stored file name usable with the file endpoint
    pub filename: String,
    /// Media title reported by the engine
    pub title: String,
}

/// Body of `POST /api/info`
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct InfoRequest {
    /// Media page URL (required)
    #[serde(default)]
    pub url: Option<String>,
}

/// Metadata probed from the engine without downloading
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaInfo {
    /// Media title
    pub title: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Number of available formats
    pub formats: usize,
}

/// Event emitted during the job lifecycle
///
/// Consumers subscribe via `MediaDownloader::subscribe()` or the SSE endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job registered and handed to the engine
    Started {
        /// Job ID
        id: JobId,
        /// Host of the requested URL
        host: Option<String>,
    },

    /// Engine reported transfer progress
    Progress {
        /// Job ID
        id: JobId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
        /// Speed string as reported by the engine
        speed: Option<String>,
        /// ETA string as reported by the engine
        eta: Option<String>,
    },

    /// Raw transfer finished, post-processing started
    Processing {
        /// Job ID
        id: JobId,
    },

    /// Output file confirmed
    Completed {
        /// Job ID
        id: JobId,
        /// Stored file name
        filename: String,
        /// Media title
        title: String,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Retention sweep removed stale files
    Swept {
        /// Number of files removed
        removed: usize,
    },

    /// Service is shutting down
    Shutdown,
}

/// What the running service can do, served at `GET /api/capabilities`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Engine implementation name
    pub engine: String,
    /// Whether the engine can be invoked
    pub engine_available: bool,
    /// Storage directory
    pub download_dir: String,
    /// Age in seconds after which stored files are swept
    pub retention_secs: u64,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique_and_round_trip_through_display() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        let parsed: JobId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn job_id_serializes_as_plain_string() {
        let id = JobId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn quality_parses_best_and_heights() {
        assert_eq!("best".parse::<Quality>().unwrap(), Quality::Best);
        assert_eq!("BEST".parse::<Quality>().unwrap(), Quality::Best);
        assert_eq!("".parse::<Quality>().unwrap(), Quality::Best);
        assert_eq!("720".parse::<Quality>().unwrap(), Quality::MaxHeight(720));
        assert_eq!("1080p".parse::<Quality>().unwrap(), Quality::MaxHeight(1080));
    }

    #[test]
    fn quality_rejects_garbage() {
        for bad in ["0", "-1", "hd", "720]+bestaudio", "99999999999"] {
            let err = bad.parse::<Quality>().unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{bad}");
        }
    }

    #[test]
    fn download_request_defaults() {
        let req: DownloadRequest =
            serde_json::from_str(r#"{"url": "https://example.com/v"}"#).unwrap();
        assert_eq!(req.kind, MediaKind::Video);
        assert_eq!(req.quality, "best");

        let req: DownloadRequest =
            serde_json::from_str(r#"{"url": "u", "type": "audio", "quality": "480"}"#).unwrap();
        assert_eq!(req.kind, MediaKind::Audio);
        assert_eq!(req.quality, "480");

        let req: DownloadRequest = serde_json::from_str(r#"{"url": "u", "quality": 360}"#).unwrap();
        assert_eq!(req.quality, "360");

        let req: DownloadRequest = serde_json::from_str("{}").unwrap();
        assert!(req.url.is_none());
    }

    #[test]
    fn not_found_state_serializes_to_status_only() {
        let json = serde_json::to_value(JobState::not_found()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "not_found"}));
    }

    #[test]
    fn starting_state_serializes_with_zero_percent() {
        let json = serde_json::to_value(JobState::starting()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "starting", "percent": 0.0}));
    }

    #[test]
    fn terminal_statuses() {
        assert!(Status::Completed.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(!Status::Downloading.is_terminal());
        assert!(!Status::Processing.is_terminal());
    }

    #[test]
    fn events_are_tagged() {
        let json = serde_json::to_value(Event::Processing { id: JobId::new() }).unwrap();
        assert_eq!(json["type"], "processing");
    }
}
