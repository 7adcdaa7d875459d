// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dry-run planner.
//!
//! Invokes the transfer tool in diagnostic mode over the whole job and
//! parses the itemized change listing into a summary without mutating
//! the destination. Planned sizes come from stat'ing the local source,
//! so their accuracy tracks the mount's metadata freshness.

use crate::engine::EngineConfig;
use crate::preflight;
use std::path::Path;
use syncd_adapters::{
    base_options, dry_run_command, is_error_line, parse_change, spawn_merged, ChangeKind,
    PlannedChange,
};
use syncd_core::SyncJob;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Cap on itemized entries carried in a report.
pub const MAX_REPORT_ITEMS: usize = 500;

/// Summary of a dry run.
#[derive(Debug, Clone, Default)]
pub struct DryRunReport {
    pub transfers: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Total bytes of planned transfers and updates, from local stat.
    pub bytes_planned: u64,
    /// First [`MAX_REPORT_ITEMS`] planned changes.
    pub items: Vec<PlannedChange>,
    /// Error lines from the tool's diagnostic stream.
    pub errors: Vec<String>,
    /// Filename issues a preflight scan of the source would flag.
    pub filename_issues: usize,
}

/// Plan a job without touching the destination.
pub async fn plan(job: &SyncJob, config: &EngineConfig) -> DryRunReport {
    let source = Path::new(job.source_path.trim_end_matches('/')).to_path_buf();
    let dest = Path::new(job.dest_path.trim_end_matches('/')).to_path_buf();
    let opts = base_options(&job.rsync_options, &job.exclude_patterns);

    let mut report = DryRunReport::default();

    let issue_source = source.clone();
    let excludes = job.exclude_patterns.clone();
    report.filename_issues =
        tokio::task::spawn_blocking(move || preflight::count_issues(&issue_source, &excludes))
            .await
            .unwrap_or(0);

    let cmd = dry_run_command(&config.transfer_tool, &opts, &source, &dest);
    let (mut child, output) = match spawn_merged(cmd) {
        Ok(spawned) => spawned,
        Err(e) => {
            report
                .errors
                .push(format!("failed to launch dry run: {}", e));
            return report;
        }
    };

    // One combined stream: change lines and error lines interleave the
    // way the tool emitted them
    let mut lines = BufReader::new(output).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_error_line(line) {
            report.errors.push(line.to_string());
            continue;
        }
        let Some(change) = parse_change(line) else {
            continue;
        };
        match change.kind {
            ChangeKind::Transfer => report.transfers += 1,
            ChangeKind::Update => report.updates += 1,
            ChangeKind::Delete => report.deletes += 1,
        }
        if change.kind != ChangeKind::Delete && !change.is_dir {
            if let Ok(meta) = std::fs::metadata(source.join(&change.path)) {
                report.bytes_planned += meta.len();
            }
        }
        if report.items.len() < MAX_REPORT_ITEMS {
            report.items.push(change);
        }
    }

    match child.wait().await {
        Ok(status) if !status.success() => {
            report.errors.push(format!(
                "dry run exited with code {}",
                status.code().unwrap_or(-1)
            ));
        }
        Ok(_) => {}
        Err(e) => {
            report.errors.push(format!("failed to reap dry run: {}", e));
        }
    }

    debug!(
        transfers = report.transfers,
        updates = report.updates,
        deletes = report.deletes,
        bytes = report.bytes_planned,
        "dry run planned"
    );
    report
}

#[cfg(test)]
#[path = "dry_run_tests.rs"]
mod tests;
