// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filename issue detection and normalization.
//!
//! Names containing characters that are illegal or dangerous on common
//! filesystems are tagged before transfer, with a suggested rename the
//! operator can apply. Detection and normalization are pure functions;
//! the issue records they produce are persisted by the issue store.

use crate::job::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

crate::define_id! {
    /// Unique identifier for a detected filename issue.
    pub struct IssueId;
}

/// Why a name was flagged. Closed set; detection returns the first match
/// in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Backslash,
    Colon,
    Asterisk,
    QuestionMark,
    DoubleQuote,
    LessThan,
    GreaterThan,
    Pipe,
    NullByte,
    ControlChar,
    LeadingSpace,
    TrailingSpace,
    TrailingDot,
    TooLong,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            IssueKind::Backslash => "backslash",
            IssueKind::Colon => "colon",
            IssueKind::Asterisk => "asterisk",
            IssueKind::QuestionMark => "question_mark",
            IssueKind::DoubleQuote => "double_quote",
            IssueKind::LessThan => "less_than",
            IssueKind::GreaterThan => "greater_than",
            IssueKind::Pipe => "pipe",
            IssueKind::NullByte => "null_byte",
            IssueKind::ControlChar => "control_char",
            IssueKind::LeadingSpace => "leading_space",
            IssueKind::TrailingSpace => "trailing_space",
            IssueKind::TrailingDot => "trailing_dot",
            IssueKind::TooLong => "too_long",
        };
        write!(f, "{}", tag)
    }
}

/// Resolution state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    Renamed,
    Skipped,
    Failed,
}

impl Default for IssueStatus {
    fn default() -> Self {
        IssueStatus::Pending
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueStatus::Pending => write!(f, "pending"),
            IssueStatus::Renamed => write!(f, "renamed"),
            IssueStatus::Skipped => write!(f, "skipped"),
            IssueStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A flagged file or directory name found by the preflight scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameIssue {
    pub id: IssueId,
    pub job_id: JobId,
    pub job_name: String,
    /// Absolute path of the flagged entry under the source root.
    pub source_path: PathBuf,
    /// Path relative to the source root.
    pub relative_path: PathBuf,
    /// Leaf name that triggered detection.
    pub file_name: String,
    pub is_dir: bool,
    pub kind: IssueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offending_char: Option<char>,
    /// Suggested normalized name; absent when normalization is identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_name: Option<String>,
    #[serde(default)]
    pub status: IssueStatus,
    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FilenameIssue {
    /// Build an issue record for a flagged name, computing the suggestion.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: IssueId,
        job_id: JobId,
        job_name: impl Into<String>,
        source_base: &Path,
        relative_path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        is_dir: bool,
        kind: IssueKind,
        offending_char: Option<char>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let relative_path = relative_path.into();
        let file_name = file_name.into();
        let suggested = normalize_name(&file_name);
        Self {
            id,
            job_id,
            job_name: job_name.into(),
            source_path: source_base.join(&relative_path),
            relative_path,
            suggested_name: (suggested != file_name).then_some(suggested),
            file_name,
            is_dir,
            kind,
            offending_char,
            status: IssueStatus::Pending,
            detected_at,
            resolved_at: None,
        }
    }
}

/// Characters that are problematic on common filesystems, with their
/// normalization replacements. Checked in table order; first hit wins.
const SPECIAL_CHARS: [(char, IssueKind, Option<char>); 9] = [
    ('\\', IssueKind::Backslash, Some('-')),
    (':', IssueKind::Colon, Some('-')),
    ('*', IssueKind::Asterisk, Some('_')),
    ('?', IssueKind::QuestionMark, Some('_')),
    ('"', IssueKind::DoubleQuote, Some('\'')),
    ('<', IssueKind::LessThan, Some('(')),
    ('>', IssueKind::GreaterThan, Some(')')),
    ('|', IssueKind::Pipe, Some('-')),
    ('\0', IssueKind::NullByte, None),
];

/// Maximum name length in UTF-8 bytes, the common filesystem limit.
pub const MAX_NAME_BYTES: usize = 255;

/// Check a file or directory name for problems.
///
/// Returns the first matching issue in priority order (special characters,
/// control characters, leading/trailing space, trailing dot, length), with
/// the offending character where there is one.
pub fn check_name(name: &str) -> Option<(IssueKind, Option<char>)> {
    for (ch, kind, _) in SPECIAL_CHARS {
        if name.contains(ch) {
            return Some((kind, Some(ch)));
        }
    }
    if let Some(ctrl) = name.chars().find(|c| (*c as u32) < 32) {
        return Some((IssueKind::ControlChar, Some(ctrl)));
    }
    if name.starts_with(' ') {
        return Some((IssueKind::LeadingSpace, Some(' ')));
    }
    if name.ends_with(' ') {
        return Some((IssueKind::TrailingSpace, Some(' ')));
    }
    if name.ends_with('.') && name != "." && name != ".." {
        return Some((IssueKind::TrailingDot, Some('.')));
    }
    if name.len() > MAX_NAME_BYTES {
        return Some((IssueKind::TooLong, None));
    }
    None
}

/// Produce a normalized name with all problems removed.
///
/// Substitutes the special characters, drops control characters, strips
/// leading/trailing spaces and trailing dots, falls back to `_renamed_`
/// when nothing remains, and truncates to [`MAX_NAME_BYTES`] preserving
/// the final extension. Idempotent, and the identity on clean names.
pub fn normalize_name(name: &str) -> String {
    // Never flagged by detection, so never rewritten
    if name.is_empty() || name == "." || name == ".." {
        return name.to_string();
    }

    let mut result = String::with_capacity(name.len());
    for c in name.chars() {
        if let Some((_, _, replacement)) = SPECIAL_CHARS.iter().find(|(ch, _, _)| *ch == c) {
            if let Some(r) = replacement {
                result.push(*r);
            }
        } else if (c as u32) >= 32 {
            result.push(c);
        }
    }

    // Trailing spaces and dots strip as a mix ("a .." → "a"), otherwise
    // one strip can expose the other and normalization loses idempotence
    let mut result = result
        .trim_start_matches(' ')
        .trim_end_matches([' ', '.'])
        .to_string();

    if result.is_empty() {
        return "_renamed_".to_string();
    }

    if result.len() > MAX_NAME_BYTES {
        result = truncate_name(result);
    }
    result
}

/// Truncate an over-long name to the byte limit, keeping the extension
/// after the last `.` when it fits.
fn truncate_name(name: String) -> String {
    let (mut base, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (name[..idx].to_string(), name[idx..].to_string()),
        _ => (name, String::new()),
    };

    if ext.len() + 1 >= MAX_NAME_BYTES {
        // Extension alone blows the budget; keep the head of the whole name
        let mut whole = base + &ext;
        while whole.len() > MAX_NAME_BYTES {
            whole.pop();
        }
        let whole = whole.trim_end_matches([' ', '.']).to_string();
        if whole.is_empty() {
            return "_renamed_".to_string();
        }
        return whole;
    }

    let max_base = MAX_NAME_BYTES - ext.len() - 1;
    while base.len() > max_base {
        base.pop();
    }
    base + &ext
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
