// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only error log for run failures.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use syncd_core::JobId;
use tracing::warn;

/// Append a run's error lines to `errors.log` under the log directory,
/// keyed by timestamp, job name, and job id. Failures are logged and
/// swallowed — the error log is best-effort.
pub fn append(
    log_dir: &Path,
    job_name: &str,
    job_id: &JobId,
    errors: &[String],
    now: DateTime<Utc>,
) {
    if let Err(e) = try_append(log_dir, job_name, job_id, errors, now) {
        warn!(error = %e, "failed to write errors.log");
    }
}

fn try_append(
    log_dir: &Path,
    job_name: &str,
    job_id: &JobId,
    errors: &[String],
    now: DateTime<Utc>,
) -> std::io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("errors.log"))?;
    writeln!(
        file,
        "\n[{}] Job: {} ({})",
        now.format("%Y-%m-%d %H:%M:%S"),
        job_name,
        job_id
    )?;
    for error in errors {
        writeln!(file, "  {}", error)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "error_log_tests.rs"]
mod tests;
