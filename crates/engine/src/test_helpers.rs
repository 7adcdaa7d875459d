// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for engine tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Write an executable shell script standing in for the transfer tool.
pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-rsync");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Poll until `condition` holds or the deadline passes.
pub async fn wait_until(condition: impl Fn() -> bool, deadline: Duration) {
    let start = Instant::now();
    while !condition() {
        assert!(
            start.elapsed() <= deadline,
            "condition not met within {:?}",
            deadline
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
