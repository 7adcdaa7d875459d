// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync job definition and lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a sync job.
    ///
    /// Assigned once at creation and immutable for the life of the job;
    /// referenced by progress records, filename issues, and logs.
    pub struct JobId;
}

/// Maximum number of parallel workers a job may declare.
pub const MAX_CONCURRENCY: u32 = 32;

/// Maximum length of a job name in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Status of a sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not running; initial state and terminal resting state
    Idle,
    /// A run is in flight
    Running,
    /// Last run finished with zero errors
    Completed,
    /// Last run finished with errors or failed preflight
    Failed,
    /// Last run was stopped by the user
    Stopped,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Idle
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Direction of a sync operation.
///
/// The engine copies source to destination regardless; the direction tag
/// records which side is the filespace mount. `Bidirectional` is rejected
/// at validation time — the transfer invocation is one-directional and
/// bidirectional semantics are undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    LocalToFilespace,
    FilespaceToLocal,
    Bidirectional,
}

impl Default for SyncDirection {
    fn default() -> Self {
        SyncDirection::LocalToFilespace
    }
}

/// Immutable statistics for a single completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub duration_secs: f64,
    pub files_synced: u64,
    pub bytes_transferred: u64,
    pub files_per_sec: f64,
    pub bytes_per_sec: f64,
    pub errors: u64,
}

impl RunStats {
    /// Build run stats with rates derived from the duration.
    pub fn new(duration_secs: f64, files_synced: u64, bytes_transferred: u64, errors: u64) -> Self {
        let (files_per_sec, bytes_per_sec) = if duration_secs > 0.0 {
            (
                files_synced as f64 / duration_secs,
                bytes_transferred as f64 / duration_secs,
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            duration_secs,
            files_synced,
            bytes_transferred,
            files_per_sec,
            bytes_per_sec,
            errors,
        }
    }
}

/// Errors from validating a job spec or patch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("job name must not be empty")]
    EmptyName,
    #[error("job name exceeds {MAX_NAME_LEN} characters")]
    NameTooLong,
    #[error("concurrency must be between 1 and {MAX_CONCURRENCY}, got {0}")]
    ConcurrencyOutOfRange(u32),
    #[error("{0} path must be absolute, got {1:?}")]
    RelativePath(&'static str, String),
    #[error("bidirectional sync is not supported")]
    BidirectionalUnsupported,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

fn validate_concurrency(concurrency: u32) -> Result<(), ValidationError> {
    if concurrency < 1 || concurrency > MAX_CONCURRENCY {
        return Err(ValidationError::ConcurrencyOutOfRange(concurrency));
    }
    Ok(())
}

fn validate_path(label: &'static str, path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::RelativePath(label, path.to_string()));
    }
    Ok(())
}

fn validate_direction(direction: SyncDirection) -> Result<(), ValidationError> {
    if direction == SyncDirection::Bidirectional {
        return Err(ValidationError::BidirectionalUnsupported);
    }
    Ok(())
}

fn default_interval() -> u64 {
    300
}

fn default_concurrency() -> u32 {
    4
}

fn default_rsync_options() -> String {
    "-avz".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Parameters for creating a new sync job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub source_path: String,
    pub dest_path: String,
    #[serde(default)]
    pub direction: SyncDirection,
    /// Manual interval hint in seconds; informational only, nothing in
    /// the engine fires on it.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Whitespace-split option string for the transfer tool. No shell
    /// quoting or expansion is applied.
    #[serde(default = "default_rsync_options")]
    pub rsync_options: String,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl JobSpec {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_path("source", &self.source_path)?;
        validate_path("destination", &self.dest_path)?;
        validate_direction(self.direction)?;
        validate_concurrency(self.concurrency)
    }
}

/// Partial update for an existing job. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SyncDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsync_options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl JobPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        if let Some(ref source) = self.source_path {
            validate_path("source", source)?;
        }
        if let Some(ref dest) = self.dest_path {
            validate_path("destination", dest)?;
        }
        if let Some(direction) = self.direction {
            validate_direction(direction)?;
        }
        if let Some(concurrency) = self.concurrency {
            validate_concurrency(concurrency)?;
        }
        Ok(())
    }
}

/// A user-declared synchronization unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: JobId,
    pub name: String,
    pub source_path: String,
    pub dest_path: String,
    #[serde(default)]
    pub direction: SyncDirection,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default = "default_rsync_options")]
    pub rsync_options: String,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_stats: Option<RunStats>,
    #[serde(default)]
    pub run_count: u64,
    // Lifetime aggregates across all runs
    #[serde(default)]
    pub total_files_synced: u64,
    #[serde(default)]
    pub total_bytes_transferred: u64,
    #[serde(default)]
    pub total_run_secs: f64,
    #[serde(default)]
    pub avg_files_per_sec: f64,
    #[serde(default)]
    pub avg_bytes_per_sec: f64,
}

impl SyncJob {
    /// Create a job from a validated spec.
    pub fn new(id: JobId, spec: JobSpec, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: spec.name,
            source_path: spec.source_path,
            dest_path: spec.dest_path,
            direction: spec.direction,
            interval_secs: spec.interval_secs,
            concurrency: spec.concurrency,
            rsync_options: spec.rsync_options,
            exclude_patterns: spec.exclude_patterns,
            enabled: spec.enabled,
            status: JobStatus::Idle,
            created_at: now,
            updated_at: now,
            last_run_at: None,
            last_run_status: None,
            last_run_message: None,
            last_run_duration: None,
            last_run_stats: None,
            run_count: 0,
            total_files_synced: 0,
            total_bytes_transferred: 0,
            total_run_secs: 0.0,
            avg_files_per_sec: 0.0,
            avg_bytes_per_sec: 0.0,
        }
    }

    /// Apply a validated patch, bumping `updated_at`.
    pub fn apply_patch(&mut self, patch: JobPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(source) = patch.source_path {
            self.source_path = source;
        }
        if let Some(dest) = patch.dest_path {
            self.dest_path = dest;
        }
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
        if let Some(interval) = patch.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(concurrency) = patch.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(opts) = patch.rsync_options {
            self.rsync_options = opts;
        }
        if let Some(patterns) = patch.exclude_patterns {
            self.exclude_patterns = patterns;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        self.updated_at = now;
    }

    /// Set the terminal outcome of a run.
    pub fn set_outcome(&mut self, status: JobStatus, message: impl Into<String>) {
        self.status = status;
        self.last_run_status = Some(status);
        self.last_run_message = Some(message.into());
    }

    /// Fold one run's statistics into the per-run and lifetime counters.
    ///
    /// Does not touch `status` — the terminal status is set separately so a
    /// user stop is not overwritten by run aggregation.
    pub fn record_run(&mut self, stats: RunStats, now: DateTime<Utc>) {
        self.last_run_duration = Some(stats.duration_secs);
        self.run_count += 1;
        self.total_files_synced += stats.files_synced;
        self.total_bytes_transferred += stats.bytes_transferred;
        self.total_run_secs += stats.duration_secs;
        if self.total_run_secs > 0.0 {
            self.avg_files_per_sec = self.total_files_synced as f64 / self.total_run_secs;
            self.avg_bytes_per_sec = self.total_bytes_transferred as f64 / self.total_run_secs;
        }
        self.last_run_stats = Some(stats);
        self.updated_at = now;
    }

    /// Check if a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
