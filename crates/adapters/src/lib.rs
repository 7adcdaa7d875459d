// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! syncd-adapters: Plumbing to the world outside the engine — the FUSE
//! mount, the external transfer tool, and child-process control.

pub mod mount;
pub mod subprocess;
pub mod transfer;

pub use mount::{probe_path, MountError};
pub use subprocess::{
    send_sigkill, send_sigterm, spawn_merged, terminate_child, CHILD_GRACE,
    PROGRESS_READ_DEADLINE,
};
pub use transfer::{
    base_options, dry_run_command, is_error_line, is_mount_death, item_command, parse_change,
    parse_progress, ChangeKind, PlannedChange, ProgressLine,
};
