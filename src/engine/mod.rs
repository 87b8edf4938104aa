//! Media fetch engine
//!
//! The orchestrator talks to the engine only through the [`FetchEngine`]
//! trait, so tests can substitute a scripted fake and deployments without
//! yt-dlp degrade to clear errors instead of failing at startup.
//!
//! - [`YtDlpEngine`]: drives the external `yt-dlp` binary
//! - [`UnavailableEngine`]: stand-in when no binary could be located
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::config::EngineConfig;
//! use media_dl::engine::{FetchEngine, YtDlpEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = YtDlpEngine::from_config(&EngineConfig::default())
//!         .expect("yt-dlp not found");
//!
//!     let info = engine.probe("https://example.com/watch?v=abc").await?;
//!     println!("{:?} ({} formats)", info.title, info.formats);
//!     Ok(())
//! }
//! ```

mod parser;
mod traits;
mod unavailable;
mod ytdlp;

pub use parser::{OutputLine, parse_output_line, strip_ansi};
pub use traits::{FetchEngine, FetchOutcome, ProgressEvent, ProgressListener};
pub use unavailable::UnavailableEngine;
pub use ytdlp::YtDlpEngine;
