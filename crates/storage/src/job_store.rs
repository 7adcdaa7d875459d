// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable store for sync job definitions and run history.
//!
//! The store owns the job collection; the engine reads and mutates jobs
//! through it. Persistence is one JSON document (`{ "jobs": [...] }`)
//! with sibling files:
//!
//! - `<file>.tmp` — atomic-write staging, renamed over the canonical file
//! - `<file>.backup` — copy of the previous canonical document, refreshed
//!   before every save
//! - `<file>.corrupted` — raw bytes of an unparseable canonical document,
//!   preserved best-effort for forensics
//!
//! Save errors are logged and swallowed: the in-memory collection stays
//! authoritative for the rest of the process. Load falls through from the
//! canonical file to the backup to an empty collection.

use crate::doc::{read_json, write_atomic};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use syncd_core::{JobId, JobPatch, JobSpec, JobStatus, SyncJob, ValidationError};
use tracing::{error, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct JobsDoc {
    #[serde(default)]
    jobs: Vec<SyncJob>,
}

/// Store of job definitions, persisted as a single JSON document.
pub struct JobStore {
    path: PathBuf,
    jobs: Mutex<IndexMap<JobId, SyncJob>>,
}

impl JobStore {
    /// Load the store from disk, falling back to the backup and then to an
    /// empty collection. Jobs are forced to `Idle` — a persisted `Running`
    /// status is stale state from a crash.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut jobs = IndexMap::new();
        for mut job in load_candidates(&path) {
            job.status = JobStatus::Idle;
            jobs.insert(job.id.clone(), job);
        }
        Self {
            path,
            jobs: Mutex::new(jobs),
        }
    }

    /// Path of the canonical document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and insert a new job, persisting the collection.
    pub fn create(
        &self,
        id: JobId,
        spec: JobSpec,
        now: DateTime<Utc>,
    ) -> Result<SyncJob, ValidationError> {
        spec.validate()?;
        let job = SyncJob::new(id, spec, now);
        {
            let mut jobs = self.jobs.lock();
            jobs.insert(job.id.clone(), job.clone());
        }
        self.save();
        Ok(job)
    }

    /// Look up a job by id.
    pub fn get(&self, id: &JobId) -> Option<SyncJob> {
        self.jobs.lock().get(id).cloned()
    }

    /// All jobs in insertion order.
    pub fn list(&self) -> Vec<SyncJob> {
        self.jobs.lock().values().cloned().collect()
    }

    /// Apply a validated patch to an existing job, persisting on success.
    /// Returns `Ok(None)` when the job does not exist.
    pub fn update(
        &self,
        id: &JobId,
        patch: JobPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<SyncJob>, ValidationError> {
        patch.validate()?;
        let updated = {
            let mut jobs = self.jobs.lock();
            match jobs.get_mut(id) {
                Some(job) => {
                    job.apply_patch(patch, now);
                    Some(job.clone())
                }
                None => None,
            }
        };
        if updated.is_some() {
            self.save();
        }
        Ok(updated)
    }

    /// Remove a job. Returns whether it existed.
    pub fn delete(&self, id: &JobId) -> bool {
        let removed = self.jobs.lock().shift_remove(id).is_some();
        if removed {
            self.save();
        }
        removed
    }

    /// Read-modify-write hook for the engine: apply `f` to the job under
    /// the lock, then persist. Returns the updated job.
    pub fn mutate<F>(&self, id: &JobId, f: F) -> Option<SyncJob>
    where
        F: FnOnce(&mut SyncJob),
    {
        let updated = {
            let mut jobs = self.jobs.lock();
            let job = jobs.get_mut(id)?;
            f(job);
            Some(job.clone())
        };
        if updated.is_some() {
            self.save();
        }
        updated
    }

    /// Persist the whole collection. Errors are logged and swallowed — the
    /// in-memory state remains authoritative.
    pub fn save(&self) {
        let doc = JobsDoc {
            jobs: self.jobs.lock().values().cloned().collect(),
        };

        // Refresh the backup from the previous canonical document
        if self.path.exists() {
            let backup = backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup) {
                warn!(error = %e, path = %self.path.display(), "failed to refresh jobs backup");
            }
        }

        if let Err(e) = write_atomic(&self.path, &doc) {
            error!(error = %e, path = %self.path.display(), "failed to save jobs");
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("backup")
}

fn corrupted_path(path: &Path) -> PathBuf {
    path.with_extension("corrupted")
}

/// Try the canonical document, then the backup. An unparseable canonical
/// document is preserved to `.corrupted` (best-effort) before falling
/// through.
fn load_candidates(path: &Path) -> Vec<SyncJob> {
    match read_json::<JobsDoc>(path) {
        Ok(Some(doc)) => return doc.jobs,
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, path = %path.display(), "jobs file unreadable, trying backup");
            preserve_corrupted(path);
        }
    }

    let backup = backup_path(path);
    match read_json::<JobsDoc>(&backup) {
        Ok(Some(doc)) => {
            warn!(path = %backup.display(), "recovered jobs from backup");
            doc.jobs
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            error!(error = %e, path = %backup.display(), "jobs backup unreadable, starting empty");
            Vec::new()
        }
    }
}

/// Keep the raw bytes of an unparseable document for forensics. Never
/// blocks recovery.
fn preserve_corrupted(path: &Path) {
    let dest = corrupted_path(path);
    if let Err(e) = fs::copy(path, &dest) {
        warn!(error = %e, path = %path.display(), "failed to preserve corrupted jobs file");
    }
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
