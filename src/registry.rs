//! In-memory job registry
//!
//! Maps job identifiers to their mutable progress/result state. Every
//! operation holds the lock for a short synchronous section only, so the
//! engine's progress callback may call [`JobRegistry::update`] from any
//! thread or task while HTTP handlers read with [`JobRegistry::get`].

use crate::types::{JobId, JobState, JobUpdate, Status};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Concurrent-safe table of job states (cheap to clone, all clones share the table)
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, JobState>>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobState>> {
        // Merges are plain field assignments; a poisoned table is still consistent.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a job as `starting` with 0% progress, overwriting any previous entry
    pub fn create(&self, id: JobId) {
        self.lock().insert(id, JobState::starting());
        tracing::debug!(download_id = %id, "job registered");
    }

    /// Merge a partial update into an existing entry
    ///
    /// Unknown ids are ignored and never create an entry. Entries that reached
    /// `completed` or `failed` are not modified, and a job in `processing`
    /// does not go back to `starting`/`downloading`.
    pub fn update(&self, id: JobId, update: JobUpdate) {
        let mut jobs = self.lock();
        let Some(state) = jobs.get_mut(&id) else {
            tracing::trace!(download_id = %id, "update for unknown job ignored");
            return;
        };

        if state.status.is_terminal() {
            tracing::trace!(download_id = %id, status = ?state.status, "update for finished job ignored");
            return;
        }

        if state.status == Status::Processing
            && matches!(update.status, Some(Status::Starting | Status::Downloading))
        {
            return;
        }

        merge(state, update);
    }

    /// Mark a job completed with its stored file name and title
    pub fn mark_completed(&self, id: JobId, filename: impl Into<String>, title: impl Into<String>) {
        self.update(
            id,
            JobUpdate {
                status: Some(Status::Completed),
                percent: Some(100.0),
                filename: Some(filename.into()),
                title: Some(title.into()),
                ..Default::default()
            },
        );
    }

    /// Mark a job failed with an error message
    pub fn mark_failed(&self, id: JobId, error: impl Into<String>) {
        self.update(
            id,
            JobUpdate {
                status: Some(Status::Failed),
                error: Some(error.into()),
                ..Default::default()
            },
        );
    }

    /// Current state of a job, or the `not_found` sentinel
    pub fn get(&self, id: JobId) -> JobState {
        self.lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(JobState::not_found)
    }

    /// Whether the registry holds an entry for `id`
    pub fn contains(&self, id: JobId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no jobs are tracked
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove entries that have not changed for longer than `older_than`
    ///
    /// Returns the number of entries removed.
    pub fn prune(&self, older_than: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(older_than) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;

        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, state| state.updated_at >= cutoff);
        let removed = before - jobs.len();

        if removed > 0 {
            tracing::debug!(removed, remaining = jobs.len(), "pruned stale job entries");
        }
        removed
    }
}

fn merge(state: &mut JobState, update: JobUpdate) {
    let JobUpdate {
        status,
        percent,
        speed,
        eta,
        filename,
        title,
        error,
    } = update;

    let next_status = status.unwrap_or(state.status);

    match next_status {
        Status::Downloading => {
            if let Some(p) = percent {
                let p = p.clamp(0.0, 100.0);
                let floor = if state.status == Status::Downloading {
                    state.percent.unwrap_or(0.0)
                } else {
                    0.0
                };
                state.percent = Some(p.max(floor));
            }
            if speed.is_some() {
                state.speed = speed;
            }
            if eta.is_some() {
                state.eta = eta;
            }
        }
        Status::Processing | Status::Completed => {
            state.percent = Some(100.0);
            state.speed = None;
            state.eta = None;
        }
        Status::Starting | Status::Failed | Status::NotFound => {
            if let Some(p) = percent {
                state.percent = Some(p.clamp(0.0, 100.0));
            }
            state.speed = None;
            state.eta = None;
        }
    }

    // `not_found` is a query-time sentinel and is never stored
    if next_status != Status::NotFound {
        state.status = next_status;
    }

    if state.status == Status::Completed {
        if filename.is_some() {
            state.filename = filename;
        }
        if title.is_some() {
            state.title = title;
        }
    }

    if state.status == Status::Failed && error.is_some() {
        state.error = error;
    }

    state.updated_at = Utc::now();
}
