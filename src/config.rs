//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable selecting the listen port
pub const PORT_ENV: &str = "PORT";

/// Storage area and retention settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Directory holding job output files (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Files older than this are deleted by the sweeper (default: 3600 seconds)
    #[serde(default = "default_retention", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub retention: Duration,

    /// How often the sweeper runs (default: 3600 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Fetch engine (yt-dlp) settings and format policy constants
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Path to ffmpeg, passed to yt-dlp as `--ffmpeg-location` when set
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Codec audio downloads are transcoded to (default: "mp3")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Target audio bitrate in kbit/s (default: 192)
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,

    /// Container video downloads are merged and recoded into (default: "mp4")
    #[serde(default = "default_video_container")]
    pub video_container: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: default_audio_bitrate(),
            video_container: default_video_container(),
        }
    }
}

/// Job registry settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegistryConfig {
    /// Drop job entries not updated for this long (default: None = keep for process lifetime)
    ///
    /// Pruning runs on each sweeper cycle.
    #[serde(default, with = "option_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub entry_ttl: Option<Duration>,
}

/// External access settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

/// Main configuration for MediaDownloader
///
/// - [`storage`](StorageConfig): output directory and retention
/// - [`engine`](EngineConfig): yt-dlp location and format policy constants
/// - [`registry`](RegistryConfig): job table bounds
/// - [`server`](ServerIntegrationConfig): REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Storage area settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fetch engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Job registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Default configuration with the listen port taken from `PORT`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_port(std::env::var(PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Override the API port; `None` keeps the current value
    pub fn apply_port(&mut self, port: Option<&str>) -> Result<()> {
        let Some(raw) = port else {
            return Ok(());
        };

        let port: u16 = raw.trim().parse().map_err(|_| Error::Config {
            message: format!("invalid port {raw:?}"),
            key: Some(PORT_ENV.to_string()),
        })?;
        self.server.api.bind_address.set_port(port);
        Ok(())
    }

    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.storage.download_dir
    }
}

// Default value functions
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_retention() -> Duration {
    Duration::from_secs(3600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_true() -> bool {
    true
}

fn default_audio_codec() -> String {
    "mp3".into()
}

fn default_audio_bitrate() -> u32 {
    192
}

fn default_video_container() -> String {
    "mp4".into()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

/// Durations are (de)serialized as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
