//! Format resolution policy
//!
//! Maps a requested (media kind, quality) pair to the stream selection and
//! post-processing the fetch engine should apply. Pure: no state, no I/O.
//!
//! Height-constrained requests degrade through a fallback chain ending in an
//! unconstrained selection, so a source without a matching stream still
//! downloads instead of failing.

use crate::config::EngineConfig;
use crate::types::{MediaKind, Quality};
use serde::{Deserialize, Serialize};

/// Ordered list of stream-selection candidates, tried first to last
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSelector {
    candidates: Vec<String>,
}

impl FormatSelector {
    /// Build a selector from candidates in preference order
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// Candidates in preference order
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// The last-resort candidate
    pub fn fallback(&self) -> Option<&str> {
        self.candidates.last().map(String::as_str)
    }

    /// Whether any candidate restricts stream height
    pub fn is_height_constrained(&self) -> bool {
        self.candidates.iter().any(|c| c.contains("height"))
    }
}

/// yt-dlp's `-f` syntax: candidates separated by `/`
impl std::fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.candidates.join("/"))
    }
}

/// Post-processing step applied after the raw transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcessor {
    /// Extract the audio track and transcode it
    ExtractAudio {
        /// Target codec (e.g. "mp3")
        codec: String,
        /// Target bitrate in kbit/s
        bitrate_kbps: u32,
    },
    /// Recode the video into a container, guaranteeing the final extension
    RecodeVideo {
        /// Target container (e.g. "mp4")
        container: String,
    },
}

/// Resolved selection and post-processing instructions for one job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchDirective {
    /// Stream selection with fallback chain
    pub format: FormatSelector,
    /// Container used when merging separate video and audio streams
    pub merge_output_format: Option<String>,
    /// Steps run after download, in order
    pub post_processors: Vec<PostProcessor>,
    /// Extension the final file is expected to carry
    pub extension: String,
}

impl FetchDirective {
    /// Whether the directive only ever selects audio streams
    pub fn is_audio_only(&self) -> bool {
        self.format
            .candidates()
            .iter()
            .all(|c| c.starts_with("bestaudio") || is_post_extracted(c, &self.post_processors))
    }
}

// `best` counts as audio-only when ExtractAudio strips the video track
fn is_post_extracted(candidate: &str, post_processors: &[PostProcessor]) -> bool {
    candidate == "best"
        && post_processors
            .iter()
            .any(|p| matches!(p, PostProcessor::ExtractAudio { .. }))
}

/// Resolve the directive for a request
pub fn resolve(kind: MediaKind, quality: &Quality, engine: &EngineConfig) -> FetchDirective {
    match kind {
        MediaKind::Audio => FetchDirective {
            format: FormatSelector::new(["bestaudio", "best"]),
            merge_output_format: None,
            post_processors: vec![PostProcessor::ExtractAudio {
                codec: engine.audio_codec.clone(),
                bitrate_kbps: engine.audio_bitrate_kbps,
            }],
            extension: engine.audio_codec.clone(),
        },
        MediaKind::Video => {
            let format = match quality {
                Quality::Best => FormatSelector::new(["bestvideo+bestaudio", "best"]),
                Quality::MaxHeight(h) => FormatSelector::new([
                    format!("bestvideo[height<={h}]+bestaudio"),
                    format!("best[height<={h}]"),
                    "bestvideo+bestaudio".to_string(),
                    "best".to_string(),
                ]),
            };

            FetchDirective {
                format,
                merge_output_format: Some(engine.video_container.clone()),
                post_processors: vec![PostProcessor::RecodeVideo {
                    container: engine.video_container.clone(),
                }],
                extension: engine.video_container.clone(),
            }
        }
    }
}
