// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store for filename issues found by the preflight scan.
//!
//! A simpler sibling of the job store: one JSON document
//! (`{ "issues": [...] }`), atomic writes, no backup or corruption
//! handling — a lost issue collection is recovered by re-scanning.

use crate::doc::{read_json, write_atomic};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use syncd_core::{FilenameIssue, IssueId, IssueStatus, JobId};
use tracing::{error, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct IssuesDoc {
    #[serde(default)]
    issues: Vec<FilenameIssue>,
}

/// Per-job issue counts by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub job_id: JobId,
    pub total: usize,
    pub pending: usize,
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Store of filename issues, persisted as a single JSON document.
pub struct IssueStore {
    path: PathBuf,
    issues: Mutex<IndexMap<IssueId, FilenameIssue>>,
}

impl IssueStore {
    /// Load the store from disk; an unreadable document starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut issues = IndexMap::new();
        match read_json::<IssuesDoc>(&path) {
            Ok(Some(doc)) => {
                for issue in doc.issues {
                    issues.insert(issue.id.clone(), issue);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, path = %path.display(), "issues file unreadable, starting empty");
            }
        }
        Self {
            path,
            issues: Mutex::new(issues),
        }
    }

    /// Path of the canonical document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a detected issue. Not persisted until [`save`](Self::save) — the
    /// scanner batches one save per scan.
    pub fn add(&self, issue: FilenameIssue) {
        self.issues.lock().insert(issue.id.clone(), issue);
    }

    /// Drop all issues belonging to a job, ahead of a re-scan.
    pub fn clear_job(&self, job_id: &JobId) {
        self.issues.lock().retain(|_, issue| issue.job_id != *job_id);
    }

    /// Look up an issue by id.
    pub fn get(&self, id: &IssueId) -> Option<FilenameIssue> {
        self.issues.lock().get(id).cloned()
    }

    /// All issues for a job, in detection order.
    pub fn for_job(&self, job_id: &JobId) -> Vec<FilenameIssue> {
        self.issues
            .lock()
            .values()
            .filter(|i| i.job_id == *job_id)
            .cloned()
            .collect()
    }

    /// Pending issues, optionally scoped to one job.
    pub fn pending(&self, job_id: Option<&JobId>) -> Vec<FilenameIssue> {
        self.issues
            .lock()
            .values()
            .filter(|i| i.status == IssueStatus::Pending)
            .filter(|i| job_id.is_none_or(|id| i.job_id == *id))
            .cloned()
            .collect()
    }

    /// Set an issue's resolution status, stamping `resolved_at`, and
    /// persist. Returns false when the issue does not exist.
    pub fn set_status(&self, id: &IssueId, status: IssueStatus, resolved_at: DateTime<Utc>) -> bool {
        let found = {
            let mut issues = self.issues.lock();
            match issues.get_mut(id) {
                Some(issue) => {
                    issue.status = status;
                    issue.resolved_at = Some(resolved_at);
                    true
                }
                None => false,
            }
        };
        if found {
            self.save();
        }
        found
    }

    /// Status counts for one job.
    pub fn summary(&self, job_id: &JobId) -> IssueSummary {
        let issues = self.issues.lock();
        let mut summary = IssueSummary {
            job_id: job_id.clone(),
            total: 0,
            pending: 0,
            renamed: 0,
            skipped: 0,
            failed: 0,
        };
        for issue in issues.values().filter(|i| i.job_id == *job_id) {
            summary.total += 1;
            match issue.status {
                IssueStatus::Pending => summary.pending += 1,
                IssueStatus::Renamed => summary.renamed += 1,
                IssueStatus::Skipped => summary.skipped += 1,
                IssueStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Persist the whole collection. Errors are logged and swallowed.
    pub fn save(&self) {
        let doc = IssuesDoc {
            issues: self.issues.lock().values().cloned().collect(),
        };
        if let Err(e) = write_atomic(&self.path, &doc) {
            error!(error = %e, path = %self.path.display(), "failed to save filename issues");
        }
    }
}

#[cfg(test)]
#[path = "issue_store_tests.rs"]
mod tests;
