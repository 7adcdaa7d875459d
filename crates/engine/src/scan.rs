// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source tree scanning.
//!
//! Enumerates the top-level items under a source root and sums per-item
//! file and byte totals, applying exclude globs to both directory and
//! file names during descent. Blocking filesystem work — callers run it
//! on the blocking pool.

use glob::Pattern;
use std::fs;
use std::path::Path;
use tracing::warn;

/// One top-level entry under the source root: the unit of distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanItem {
    pub name: String,
    pub is_dir: bool,
    pub files: u64,
    pub bytes: u64,
}

/// Compile exclude patterns, dropping (and logging) invalid ones.
pub(crate) fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %p, error = %e, "ignoring invalid exclude pattern");
                None
            }
        })
        .collect()
}

pub(crate) fn matches_any(name: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(name))
}

/// Recursively sum files and bytes under `path`, honoring excludes.
/// Entries that cannot be read or stat'd are silently skipped.
pub fn source_stats(path: &Path, excludes: &[String]) -> (u64, u64) {
    let patterns = compile_patterns(excludes);
    stats_walk(path, &patterns)
}

fn stats_walk(path: &Path, patterns: &[Pattern]) -> (u64, u64) {
    let mut files = 0u64;
    let mut bytes = 0u64;
    let Ok(entries) = fs::read_dir(path) else {
        return (0, 0);
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
            let (f, b) = stats_walk(&entry.path(), patterns);
            files += f;
            bytes += b;
        } else if file_type.is_file() {
            if let Ok(meta) = entry.metadata() {
                files += 1;
                bytes += meta.len();
            }
        }
    }
    (files, bytes)
}

/// List the source root non-recursively, with per-item recursive totals,
/// sorted by byte count descending — the order the distributor expects.
pub fn top_level_items(source: &Path, excludes: &[String]) -> Vec<ScanItem> {
    let patterns = compile_patterns(excludes);
    let mut items = Vec::new();
    let entries = match fs::read_dir(source) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %source.display(), error = %e, "cannot list source root");
            return items;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches_any(&name, &patterns) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            let (files, bytes) = stats_walk(&entry.path(), &patterns);
            items.push(ScanItem {
                name,
                is_dir: true,
                files,
                bytes,
            });
        } else if file_type.is_file() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            items.push(ScanItem {
                name,
                is_dir: false,
                files: 1,
                bytes: meta.len(),
            });
        }
    }
    items.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    items
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
