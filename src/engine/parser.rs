//! Parser for yt-dlp console output
//!
//! [`YtDlpEngine`](super::YtDlpEngine) asks yt-dlp to print progress and
//! the final title with fixed markers, one per line. Everything else
//! yt-dlp prints is classified as an error line or ignored.

use super::traits::ProgressEvent;
use crate::types::MediaInfo;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Marker prefixing download progress lines
pub(crate) const PROGRESS_MARKER: &str = "[media-dl:progress]";
/// Marker prefixing post-processor progress lines
pub(crate) const POSTPROCESS_MARKER: &str = "[media-dl:postprocess]";
/// Marker prefixing the title printed after the final move
pub(crate) const TITLE_MARKER: &str = "[media-dl:title]";

/// `--progress-template` for the download phase: status|percent|speed|eta
pub(crate) fn download_progress_template() -> String {
    format!(
        "download:{PROGRESS_MARKER} %(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s"
    )
}

/// `--progress-template` for the post-processing phase: status|postprocessor
pub(crate) fn postprocess_progress_template() -> String {
    format!("postprocess:{POSTPROCESS_MARKER} %(progress.status)s|%(progress.postprocessor)s")
}

/// `--print` template emitting the title once the file is in place
pub(crate) fn title_print_template() -> String {
    format!("after_move:{TITLE_MARKER} %(title)s")
}

/// One classified line of yt-dlp output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// Progress to forward to the listener
    Progress(ProgressEvent),
    /// Title of the downloaded media
    Title(String),
    /// An `ERROR:` line
    Error(String),
    /// Anything else
    Other,
}

/// Remove ANSI color/cursor escape sequences
pub fn strip_ansi(input: &str) -> std::borrow::Cow<'_, str> {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();
    match ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").ok()) {
        Some(re) => re.replace_all(input, ""),
        None => std::borrow::Cow::Borrowed(input),
    }
}

/// Classify one line of yt-dlp stdout or stderr
pub fn parse_output_line(raw: &str) -> OutputLine {
    let cleaned = strip_ansi(raw);
    let line = cleaned.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        return parse_download_progress(rest.trim());
    }

    if let Some(rest) = line.strip_prefix(POSTPROCESS_MARKER) {
        let status = rest.trim().split('|').next().unwrap_or("").trim();
        return match status {
            "started" | "processing" => OutputLine::Progress(ProgressEvent::Finished),
            _ => OutputLine::Other,
        };
    }

    if let Some(rest) = line.strip_prefix(TITLE_MARKER) {
        let title = rest.trim();
        if title.is_empty() || title == "NA" {
            return OutputLine::Other;
        }
        return OutputLine::Title(title.to_string());
    }

    if line.starts_with("ERROR:") {
        return OutputLine::Error(line.to_string());
    }

    OutputLine::Other
}

fn parse_download_progress(fields: &str) -> OutputLine {
    let mut parts = fields.split('|').map(str::trim);
    let status = parts.next().unwrap_or("");
    let percent = parts.next().and_then(parse_percent);
    let speed = parts.next().and_then(informative);
    let eta = parts.next().and_then(informative);

    match status {
        "downloading" => match percent {
            Some(percent) => OutputLine::Progress(ProgressEvent::Downloading {
                percent,
                speed,
                eta,
            }),
            None => OutputLine::Other,
        },
        "finished" => OutputLine::Progress(ProgressEvent::Downloading {
            percent: 100.0,
            speed: None,
            eta: None,
        }),
        _ => OutputLine::Other,
    }
}

fn parse_percent(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().trim_end_matches('%').trim().parse().ok()?;
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

/// yt-dlp prints "NA"/"Unknown" placeholders when it cannot estimate a value
fn informative(raw: &str) -> Option<String> {
    let value = raw.trim();
    match value {
        "" | "NA" | "N/A" | "Unknown" | "Unknown B/s" | "Unknown speed" => None,
        _ => Some(value.to_string()),
    }
}

/// Subset of yt-dlp's `-J` info dictionary
#[derive(Deserialize)]
struct ProbeJson {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    #[serde(default)]
    formats: Vec<serde_json::Value>,
}

/// Parse the JSON document printed by `yt-dlp -J`
pub(crate) fn parse_probe_json(stdout: &[u8]) -> crate::Result<MediaInfo> {
    let probe: ProbeJson = serde_json::from_slice(stdout)?;
    Ok(MediaInfo {
        title: probe.title,
        duration: probe.duration,
        thumbnail: probe.thumbnail,
        uploader: probe.uploader,
        formats: probe.formats.len(),
    })
}
