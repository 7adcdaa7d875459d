// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live progress records for running jobs.
//!
//! A `Progress` exists only while (or shortly after) a run is active. It is
//! recreated on every start and never persisted. Workers write their own
//! `WorkerProgress` slot plus the two aggregate counters; the bus publishes
//! snapshot clones.

use crate::job::{JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one worker within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Pending,
    Running,
    Stopping,
    Stopped,
    Completed,
    Failed,
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Pending => write!(f, "pending"),
            WorkerStatus::Running => write!(f, "running"),
            WorkerStatus::Stopping => write!(f, "stopping"),
            WorkerStatus::Stopped => write!(f, "stopped"),
            WorkerStatus::Completed => write!(f, "completed"),
            WorkerStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Progress of one worker over its item partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProgress {
    pub worker_id: usize,
    /// Names of the top-level items this worker owns, in processing order.
    pub items: Vec<String>,
    pub files_total: u64,
    pub files_transferred: u64,
    pub bytes_total: u64,
    pub bytes_transferred: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    pub status: WorkerStatus,
}

impl WorkerProgress {
    pub fn new(worker_id: usize, items: Vec<String>, files_total: u64, bytes_total: u64) -> Self {
        Self {
            worker_id,
            items,
            files_total,
            files_transferred: 0,
            bytes_total,
            bytes_transferred: 0,
            current_item: None,
            rate: None,
            status: WorkerStatus::Pending,
        }
    }
}

/// Live progress for one running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Current-file hint; also carries preflight status lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    pub files_total: u64,
    pub files_transferred: u64,
    pub bytes_total: u64,
    pub bytes_transferred: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    pub percent_complete: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub workers: Vec<WorkerProgress>,
}

impl Progress {
    /// Fresh progress record for a starting run.
    pub fn begin(job_id: JobId, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            current_file: None,
            files_total: 0,
            files_transferred: 0,
            bytes_total: 0,
            bytes_transferred: 0,
            transfer_rate: None,
            eta: None,
            percent_complete: 0.0,
            started_at: Some(started_at),
            updated_at: Some(started_at),
            error_message: None,
            workers: Vec::new(),
        }
    }

    /// Recompute the aggregate counters from the worker slots.
    ///
    /// Invariant: `files_transferred` and `bytes_transferred` equal the sum
    /// over workers; `percent_complete` is bytes-based, 0 when nothing is
    /// planned.
    pub fn recompute_totals(&mut self, now: DateTime<Utc>) {
        self.files_transferred = self.workers.iter().map(|w| w.files_transferred).sum();
        self.bytes_transferred = self.workers.iter().map(|w| w.bytes_transferred).sum();
        self.percent_complete = if self.bytes_total > 0 {
            self.bytes_transferred as f64 / self.bytes_total as f64 * 100.0
        } else {
            0.0
        };
        self.updated_at = Some(now);
    }

    /// Number of workers currently in the `Running` state.
    pub fn active_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| w.status == WorkerStatus::Running)
            .count()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
