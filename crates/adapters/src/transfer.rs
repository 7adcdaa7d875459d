// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer-tool invocation and output grammar.
//!
//! The engine drives an rsync-compatible external tool as a child process
//! per item and understands three line shapes on its output: periodic
//! progress lines, error lines, and (in dry-run mode) itemized change
//! lines. The tool binary is configuration so tests can substitute a
//! script.

use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

/// Flag that makes the tool emit periodic machine-readable progress lines.
pub const PROGRESS_FLAG: &str = "--progress";

/// Flag that disables the tool's recursive batching so progress is
/// reported per line.
pub const NO_INC_RECURSIVE_FLAG: &str = "--no-inc-recursive";

/// The tool's whole-transfer progress flag. Stripped from user options:
/// across many workers its output is noise.
pub const WHOLE_TRANSFER_PROGRESS_FLAG: &str = "--info=progress2";

/// Output signatures that mean the mount died under the transfer.
const TRANSPORT_DISCONNECTED_SIGNATURE: &str = "Transport endpoint is not connected";
const STALE_HANDLE_SIGNATURE: &str = "Stale file handle";

/// One parsed progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    /// Bytes transferred so far for the current item.
    pub bytes: u64,
    pub percent: u32,
    /// Rate string as printed by the tool, e.g. `"12.34MB/s"`.
    pub rate: String,
    pub eta: Option<String>,
}

/// Build the effective option vector from a job's option string.
///
/// The string is split on whitespace — no shell quoting or expansion is
/// applied. The whole-transfer progress flag is stripped, and one
/// `--exclude <pattern>` pair is appended per exclude.
pub fn base_options(rsync_options: &str, excludes: &[String]) -> Vec<String> {
    let mut opts: Vec<String> = rsync_options
        .split_whitespace()
        .filter(|opt| *opt != WHOLE_TRANSFER_PROGRESS_FLAG)
        .map(str::to_string)
        .collect();
    for pattern in excludes {
        opts.push("--exclude".to_string());
        opts.push(pattern.clone());
    }
    opts
}

/// Build the child-process command for one item.
///
/// Files copy into the destination root; directories use trailing-slash
/// semantics so contents land inside a same-named destination directory.
/// Progress flags are appended after the user options. Spawn through
/// [`spawn_merged`](crate::subprocess::spawn_merged) so stdout and
/// stderr arrive combined on one stream.
pub fn item_command(
    tool: &str,
    opts: &[String],
    source_root: &Path,
    dest_root: &Path,
    item: &str,
    is_dir: bool,
) -> Command {
    let mut cmd = Command::new(tool);
    cmd.args(opts);
    cmd.arg(PROGRESS_FLAG);
    cmd.arg(NO_INC_RECURSIVE_FLAG);

    let item_source = source_root.join(item);
    if is_dir {
        let mut src = item_source.into_os_string();
        src.push("/");
        let mut dst = dest_root.join(item).into_os_string();
        dst.push("/");
        cmd.arg(src).arg(dst);
    } else {
        cmd.arg(item_source).arg(dest_root);
    }

    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

/// Build the dry-run command for a whole job: same options plus
/// `--dry-run --itemize-changes`, copying source contents onto the
/// destination root. Never mutates the destination.
pub fn dry_run_command(
    tool: &str,
    opts: &[String],
    source_root: &Path,
    dest_root: &Path,
) -> Command {
    let mut cmd = Command::new(tool);
    cmd.args(opts);
    cmd.arg("--dry-run").arg("--itemize-changes");

    let mut src = source_root.to_path_buf().into_os_string();
    src.push("/");
    let mut dst = dest_root.to_path_buf().into_os_string();
    dst.push("/");
    cmd.arg(src).arg(dst);

    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

/// Whether a line is a tool error report.
pub fn is_error_line(line: &str) -> bool {
    line.starts_with("rsync:") || line.starts_with("rsync error:")
}

/// Whether a line carries a fatal mount-death signature.
pub fn is_mount_death(line: &str) -> bool {
    line.contains(TRANSPORT_DISCONNECTED_SIGNATURE) || line.contains(STALE_HANDLE_SIGNATURE)
}

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn progress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([\d,]+)\s+(\d+)%\s+([\d.]+\S*/s)(\s+(\d+:\d+:\d+))?").unwrap()
    })
}

/// Parse a periodic progress line: `"  1,234,567  45%  12.34MB/s  0:01:23"`.
pub fn parse_progress(line: &str) -> Option<ProgressLine> {
    let caps = progress_re().captures(line)?;
    let bytes: u64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let percent: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(ProgressLine {
        bytes,
        percent,
        rate: caps.get(3)?.as_str().to_string(),
        eta: caps.get(5).map(|m| m.as_str().to_string()),
    })
}

/// Classification of one planned change from `--itemize-changes` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// New file or directory would be created at the destination
    Transfer,
    /// Existing destination entry would be updated
    Update,
    /// Destination entry would be deleted
    Delete,
}

/// One planned filesystem action from a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub kind: ChangeKind,
    pub path: String,
    pub is_dir: bool,
}

/// Parse one itemized change line.
///
/// Lines are an 11-column action code, a space, and a path — except
/// deletions, which start with the literal `*deleting`. Verify-only lines
/// (leading `.`) are ignored, as is the chatter the tool prints around
/// the listing.
pub fn parse_change(line: &str) -> Option<PlannedChange> {
    if let Some(rest) = line.strip_prefix("*deleting") {
        let path = rest.trim_start();
        if path.is_empty() {
            return None;
        }
        return Some(PlannedChange {
            kind: ChangeKind::Delete,
            path: path.trim_end_matches('/').to_string(),
            is_dir: path.ends_with('/'),
        });
    }

    let (code, path) = line.split_once(' ')?;
    if code.len() != 11 {
        return None;
    }
    let mut chars = code.chars();
    let action = chars.next()?;
    let kind_char = chars.next()?;
    if !matches!(kind_char, 'f' | 'd' | 'L' | 'D' | 'S') {
        return None;
    }
    let kind = match action {
        '.' => return None,
        '>' | '<' | 'c' | 'h' => {
            if code.contains('+') {
                ChangeKind::Transfer
            } else {
                ChangeKind::Update
            }
        }
        _ => return None,
    };
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    Some(PlannedChange {
        kind,
        path: path.trim_end_matches('/').to_string(),
        is_dir: kind_char == 'd',
    })
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
