// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-flight work: filename scanning, remediation, and the destination
//! directory skeleton.
//!
//! The filename scan is advisory — it records issues to the store and
//! surfaces a count, but never blocks a sync. Remediation is explicit:
//! the operator renames or skips individual issues, or sweeps every
//! pending one with the suggested names.

use crate::scan::{compile_patterns, matches_any};
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use syncd_core::{check_name, FilenameIssue, IdGen, IssueId, IssueStatus, JobId, SyncJob};
use syncd_storage::IssueStore;
use thiserror::Error;
use tracing::warn;

/// Errors from remediation operations.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("issue not found: {0}")]
    IssueNotFound(IssueId),
    #[error("issue already resolved: {0}")]
    AlreadyResolved(IssueStatus),
    #[error("no target name provided or suggested")]
    NoTargetName,
    #[error("new name is the same as the original")]
    SameName,
    #[error("target already exists: {0}")]
    TargetExists(PathBuf),
    #[error("rename failed: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a bulk rename sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub total: usize,
    pub renamed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Walk the job's source tree and record every flagged name to the
/// store, clearing the job's previous issues first. Returns the number
/// of issues found. Blocking filesystem work.
pub fn scan_source(
    job: &SyncJob,
    store: &IssueStore,
    id_gen: &impl IdGen,
    now: DateTime<Utc>,
) -> usize {
    store.clear_job(&job.id);
    let patterns = compile_patterns(&job.exclude_patterns);
    let source = Path::new(&job.source_path);
    let mut count = 0;
    scan_walk(job, store, id_gen, now, source, source, &patterns, &mut count);
    store.save();
    count
}

#[allow(clippy::too_many_arguments)]
fn scan_walk(
    job: &SyncJob,
    store: &IssueStore,
    id_gen: &impl IdGen,
    now: DateTime<Utc>,
    source_root: &Path,
    dir: &Path,
    patterns: &[Pattern],
    count: &mut usize,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot scan directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches_any(&name, patterns) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let is_dir = file_type.is_dir();
        let rel = entry
            .path()
            .strip_prefix(source_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&name));

        if let Some((kind, offending)) = check_name(&name) {
            store.add(FilenameIssue::new(
                IssueId::new(id_gen.next()),
                job.id.clone(),
                job.name.clone(),
                source_root,
                rel,
                &name,
                is_dir,
                kind,
                offending,
                now,
            ));
            *count += 1;
        }

        // Flagged directories are still descended into; only excluded
        // ones are pruned
        if is_dir {
            scan_walk(
                job,
                store,
                id_gen,
                now,
                source_root,
                &entry.path(),
                patterns,
                count,
            );
        }
    }
}

/// Apply a rename for one pending issue, using the given name or the
/// stored suggestion. On success the issue becomes `Renamed`; on a
/// filesystem failure it becomes `Failed`. Both outcomes persist.
pub fn rename_issue(
    store: &IssueStore,
    id: &IssueId,
    new_name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, RenameError> {
    let issue = store
        .get(id)
        .ok_or_else(|| RenameError::IssueNotFound(id.clone()))?;
    if issue.status != IssueStatus::Pending {
        return Err(RenameError::AlreadyResolved(issue.status));
    }

    let target = new_name
        .map(str::to_string)
        .or_else(|| issue.suggested_name.clone())
        .ok_or(RenameError::NoTargetName)?;
    if target == issue.file_name {
        return Err(RenameError::SameName);
    }

    let parent = issue
        .source_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let new_path = parent.join(&target);
    if new_path.exists() {
        return Err(RenameError::TargetExists(new_path));
    }

    match fs::rename(&issue.source_path, &new_path) {
        Ok(()) => {
            store.set_status(id, IssueStatus::Renamed, now);
            Ok(target)
        }
        Err(e) => {
            store.set_status(id, IssueStatus::Failed, now);
            Err(RenameError::Io(e))
        }
    }
}

/// Mark an issue skipped without touching the filesystem.
pub fn skip_issue(store: &IssueStore, id: &IssueId, now: DateTime<Utc>) -> Result<(), RenameError> {
    if store.get(id).is_none() {
        return Err(RenameError::IssueNotFound(id.clone()));
    }
    store.set_status(id, IssueStatus::Skipped, now);
    Ok(())
}

/// Rename every pending issue with its suggested name, optionally scoped
/// to one job. Failures are tallied and reported per item; the sweep
/// continues past them.
pub fn rename_all_pending(
    store: &IssueStore,
    job_id: Option<&JobId>,
    now: DateTime<Utc>,
) -> RenameSummary {
    let pending = store.pending(job_id);
    let mut summary = RenameSummary {
        total: pending.len(),
        ..RenameSummary::default()
    };
    for issue in pending {
        match rename_issue(store, &issue.id, None, now) {
            Ok(_) => summary.renamed += 1,
            Err(e) => {
                summary.failed += 1;
                summary
                    .errors
                    .push(format!("{}: {}", issue.relative_path.display(), e));
            }
        }
    }
    summary
}

/// Mirror the source's directory tree under the destination (excludes
/// applied), including the destination root itself. Idempotent. Returns
/// the number of directories ensured. Blocking filesystem work.
pub fn create_dest_dirs(source: &Path, dest: &Path, excludes: &[String]) -> usize {
    let patterns = compile_patterns(excludes);
    let mut count = 0;
    dirs_walk(source, dest, &patterns, &mut count);
    count
}

fn dirs_walk(source_dir: &Path, dest_dir: &Path, patterns: &[Pattern], count: &mut usize) {
    if let Err(e) = fs::create_dir_all(dest_dir) {
        warn!(path = %dest_dir.display(), error = %e, "cannot create destination directory");
        return;
    }
    *count += 1;

    let Ok(entries) = fs::read_dir(source_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches_any(&name, patterns) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            dirs_walk(&entry.path(), &dest_dir.join(&name), patterns, count);
        }
    }
}

/// Count the filename issues a scan of `source` would flag, without
/// recording anything. Used by the dry-run planner.
pub fn count_issues(source: &Path, excludes: &[String]) -> usize {
    let patterns = compile_patterns(excludes);
    let mut count = 0;
    count_walk(source, &patterns, &mut count);
    count
}

fn count_walk(dir: &Path, patterns: &[Pattern], count: &mut usize) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches_any(&name, patterns) {
            continue;
        }
        if check_name(&name).is_some() {
            *count += 1;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            count_walk(&entry.path(), patterns, count);
        }
    }
}

#[cfg(test)]
#[path = "preflight_tests.rs"]
mod tests;
