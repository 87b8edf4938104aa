//! yt-dlp engine using the external `yt-dlp` binary

use super::parser::{
    OutputLine, download_progress_template, parse_output_line, parse_probe_json,
    postprocess_progress_template, title_print_template,
};
use super::traits::{FetchEngine, FetchOutcome, ProgressListener};
use crate::config::EngineConfig;
use crate::format::{FetchDirective, PostProcessor};
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Engine driving the external `yt-dlp` binary
///
/// Progress and the final title are requested through `--progress-template`
/// and `--print` markers, so the engine never depends on yt-dlp's
/// human-readable console layout.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{FetchEngine, YtDlpEngine};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
/// let info = engine.probe("https://example.com/watch?v=abc").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
}

impl YtDlpEngine {
    /// Create an engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_path: None,
        }
    }

    /// Pass `--ffmpeg-location` on every fetch
    pub fn with_ffmpeg(mut self, ffmpeg_path: PathBuf) -> Self {
        self.ffmpeg_path = Some(ffmpeg_path);
        self
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build from configuration: explicit path first, then PATH if allowed
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let engine = match &config.yt_dlp_path {
            Some(path) => Some(Self::new(path.clone())),
            None if config.search_path => Self::from_path(),
            None => None,
        }?;

        Some(match &config.ffmpeg_path {
            Some(ffmpeg) => engine.with_ffmpeg(ffmpeg.clone()),
            None => engine,
        })
    }

    /// Path of the yt-dlp binary
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Command-line arguments for a fetch
    pub(crate) fn build_fetch_args(
        &self,
        url: &str,
        directive: &FetchDirective,
        output_template: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--newline",
            "--no-playlist",
            "--no-colors",
            "--progress",
            "--no-simulate",
            "--progress-template",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(download_progress_template().into());
        args.push("--progress-template".into());
        args.push(postprocess_progress_template().into());
        args.push("--print".into());
        args.push(title_print_template().into());

        args.push("-f".into());
        args.push(directive.format.to_string().into());

        if let Some(container) = &directive.merge_output_format {
            args.push("--merge-output-format".into());
            args.push(container.into());
        }

        for step in &directive.post_processors {
            match step {
                PostProcessor::ExtractAudio {
                    codec,
                    bitrate_kbps,
                } => {
                    args.push("-x".into());
                    args.push("--audio-format".into());
                    args.push(codec.into());
                    args.push("--audio-quality".into());
                    args.push(format!("{bitrate_kbps}K").into());
                }
                PostProcessor::RecodeVideo { container } => {
                    args.push("--recode-video".into());
                    args.push(container.into());
                }
            }
        }

        if let Some(ffmpeg) = &self.ffmpeg_path {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }

        args.push("-o".into());
        args.push(output_template.into());
        args.push("--".into());
        args.push(url.into());
        args
    }

    fn spawn_failure(&self, e: std::io::Error) -> crate::Error {
        crate::Error::ExternalTool(format!(
            "Failed to execute yt-dlp at {}: {}",
            self.binary_path.display(),
            e
        ))
    }
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    async fn probe(&self, url: &str) -> crate::Result<MediaInfo> {
        let output = Command::new(&self.binary_path)
            .args(["-J", "--no-playlist", "--no-warnings", "--"])
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_failure(e))?;

        if !output.status.success() {
            let mut tail = FailureTail::default();
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .for_each(|line| tail.push(line));
            return Err(crate::Error::Engine(tail.message(output.status)));
        }

        parse_probe_json(&output.stdout)
    }

    async fn fetch(
        &self,
        url: &str,
        directive: &FetchDirective,
        output_template: &Path,
        listener: &dyn ProgressListener,
    ) -> crate::Result<FetchOutcome> {
        let args = self.build_fetch_args(url, directive, output_template);
        tracing::debug!(binary = %self.binary_path.display(), format = %directive.format, "spawning yt-dlp");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_failure(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| crate::Error::ExternalTool("yt-dlp stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| crate::Error::ExternalTool("yt-dlp stderr not captured".into()))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;

        let mut title = None;
        let mut tail = FailureTail::default();

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line? {
                    Some(line) => match parse_output_line(&line) {
                        OutputLine::Progress(event) => listener.on_progress(event),
                        OutputLine::Title(t) => title = Some(t),
                        OutputLine::Error(e) => tail.push(&e),
                        OutputLine::Other => {}
                    },
                    None => stdout_open = false,
                },
                line = stderr_lines.next_line(), if stderr_open => match line? {
                    Some(line) => match parse_output_line(&line) {
                        OutputLine::Progress(event) => listener.on_progress(event),
                        OutputLine::Title(t) => title = Some(t),
                        OutputLine::Error(_) | OutputLine::Other => {
                            if !line.trim().is_empty() {
                                tracing::trace!(line = %line, "yt-dlp stderr");
                                tail.push(&line);
                            }
                        }
                    },
                    None => stderr_open = false,
                },
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(crate::Error::Engine(tail.message(status)));
        }

        Ok(FetchOutcome { title })
    }

    fn is_available(&self) -> bool {
        self.binary_path.is_file()
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// The two output lines a failure message can be built from
#[derive(Debug, Default)]
struct FailureTail {
    last_error: Option<String>,
    last_line: Option<String>,
}

impl FailureTail {
    fn push(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("ERROR:") {
            self.last_error = Some(line.to_string());
        }
        self.last_line = Some(line.to_string());
    }

    /// Last `ERROR:` line, else the last stderr line, else the exit status
    fn message(self, status: std::process::ExitStatus) -> String {
        self.last_error
            .or(self.last_line)
            .map(|line| super::parser::strip_ansi(&line).into_owned())
            .unwrap_or_else(|| format!("yt-dlp exited with {status}"))
    }
}
