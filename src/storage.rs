//! Storage area for job output files
//!
//! A flat directory holding `<job-id>.<ext>` files. The directory is shared
//! without locking between the orchestrator (writer), file retrieval
//! (reader) and the retention sweeper (deleter).

use crate::error::{Error, Result};
use crate::types::JobId;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};

/// Name fragments yt-dlp uses for partial or intermediate files
const TRANSIENT_MARKERS: &[&str] = &[".part", ".ytdl", ".temp.", ".tmp"];

/// Handle to the storage directory (cheap to clone)
#[derive(Clone, Debug)]
pub struct StorageArea {
    dir: PathBuf,
}

/// An opened stored file ready for streaming
#[derive(Debug)]
pub struct StoredFile {
    /// Resolved path inside the storage area
    pub path: PathBuf,
    /// Open handle
    pub file: fs::File,
    /// Size in bytes
    pub len: u64,
}

/// Outcome of one retention sweep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted
    pub removed: usize,
    /// Files younger than the retention age
    pub retained: usize,
    /// Entries that could not be inspected or deleted
    pub errors: usize,
}

impl StorageArea {
    /// Open the storage area, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output template handed to the engine: `<dir>/<id>.%(ext)s`
    pub fn output_template(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("{id}.%(ext)s"))
    }

    /// Path the output would have if the engine used the expected extension
    pub fn expected_path(&self, id: JobId, extension: &str) -> PathBuf {
        self.dir.join(format!("{id}.{extension}"))
    }

    /// Locate the output file of a job
    ///
    /// Checks `<id>.<extension>` first. The engine's post-processing may pick
    /// a different container than requested, so on a miss any completed file
    /// whose name starts with `<id>.` is accepted.
    pub async fn discover(&self, id: JobId, extension: &str) -> Result<Option<PathBuf>> {
        let expected = self.expected_path(id, extension);
        if fs::metadata(&expected)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Ok(Some(expected));
        }

        let prefix = format!("{id}.");
        let mut candidates = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) || is_transient(name) {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => candidates.push(entry.path()),
                _ => continue,
            }
        }

        candidates.sort();
        if candidates.len() > 1 {
            debug!(download_id = %id, count = candidates.len(), "multiple outputs match, using first");
        }
        Ok(candidates.into_iter().next())
    }

    /// Resolve a client-supplied filename to a path inside the storage area
    ///
    /// Only a single plain file name is accepted. The canonical result must
    /// still live inside the canonical storage directory.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_filename(name)?;

        let candidate = self.dir.join(name);
        let resolved = match fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("file {name}")));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let root = fs::canonicalize(&self.dir).await?;

        if !resolved.starts_with(&root) {
            return Err(Error::InvalidFilename {
                name: name.to_string(),
                reason: "resolves outside the storage area".to_string(),
            });
        }

        Ok(resolved)
    }

    /// Open a stored file for reading
    pub async fn open(&self, name: &str) -> Result<StoredFile> {
        let path = self.resolve(name).await?;
        let metadata = fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(Error::NotFound(format!("file {name}")));
        }

        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            // swept between resolve and open
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("file {name}")));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(StoredFile {
            path,
            file,
            len: metadata.len(),
        })
    }

    /// Delete regular files whose age exceeds `max_age`
    pub async fn sweep(&self, max_age: Duration) -> Result<SweepReport> {
        self.sweep_at(max_age, SystemTime::now()).await
    }

    /// [`sweep`](Self::sweep) with an explicit notion of "now"
    ///
    /// Errors on individual entries are logged and counted; only failing to
    /// list the directory is returned as an error.
    pub async fn sweep_at(&self, max_age: Duration, now: SystemTime) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let mut entries = fs::read_dir(&self.dir).await?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = ?self.dir, error = %e, "failed to read storage entry");
                    report.errors += 1;
                    break;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!(?path, error = %e, "failed to stat stored file");
                    report.errors += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(t) => t,
                Err(e) => {
                    warn!(?path, error = %e, "modification time unavailable");
                    report.errors += 1;
                    continue;
                }
            };

            // mtime in the future counts as age zero
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= max_age {
                report.retained += 1;
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(?path, age_secs = age.as_secs(), "deleted expired file");
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(?path, error = %e, "failed to delete expired file");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }
}

fn is_transient(name: &str) -> bool {
    TRANSIENT_MARKERS.iter().any(|m| name.contains(m)) || has_format_infix(name)
}

/// `<id>.f137.mp4`: a single stream kept around before merging
fn has_format_infix(name: &str) -> bool {
    name.split('.').any(|part| {
        part.len() > 1
            && part.starts_with('f')
            && part[1..].chars().all(|c| c.is_ascii_digit())
    })
}

fn validate_filename(name: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(Error::InvalidFilename {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("filename is empty");
    }
    if name.contains(['/', '\\', '\0']) {
        return reject("path separators are not allowed");
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => reject("must be a plain file name"),
    }
}
