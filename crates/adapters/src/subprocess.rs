// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process control helpers.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tracing::warn;

/// Grace window between SIGTERM and SIGKILL for transfer children.
pub const CHILD_GRACE: Duration = Duration::from_secs(5);

/// Read deadline on child output. Bounds how long a worker goes without
/// checking the cancellation flag, and paces mid-transfer publishes.
pub const PROGRESS_READ_DEADLINE: Duration = Duration::from_millis(500);

/// Spawn a child with stdout and stderr merged onto one pipe.
///
/// Both streams share a single write end, so progress and error lines
/// keep their true chronological interleaving — reading two pipes would
/// not. The command is consumed so the parent's write ends close with
/// it; the returned receiver sees EOF as soon as the child exits.
pub fn spawn_merged(mut cmd: Command) -> io::Result<(Child, pipe::Receiver)> {
    let (read, write) = nix::unistd::pipe()?;
    let write_clone = write.try_clone()?;
    cmd.stdout(Stdio::from(write));
    cmd.stderr(Stdio::from(write_clone));
    let child = cmd.spawn()?;
    drop(cmd);
    let output = pipe::Receiver::from_owned_fd(read)?;
    Ok((child, output))
}

/// Send SIGTERM to a process by pid.
pub fn send_sigterm(pid: u32) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(pid, error = %e, "SIGTERM failed");
    }
}

/// Send SIGKILL to a process by pid.
pub fn send_sigkill(pid: u32) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(pid, error = %e, "SIGKILL failed");
    }
}

/// Terminate an owned child: SIGTERM, wait out [`CHILD_GRACE`], then
/// SIGKILL if it has not exited.
pub async fn terminate_child(child: &mut Child) {
    if let Some(pid) = child.id() {
        send_sigterm(pid);
    }
    if tokio::time::timeout(CHILD_GRACE, child.wait()).await.is_err() {
        warn!("child did not exit within grace period, killing");
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
