// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mount health probe.
//!
//! A path is healthy when it exists and a directory listing returns
//! without error. Two errno values get their own diagnostics: `ENOTCONN`
//! (the FUSE daemon died) and `ESTALE` (the mount was invalidated). No
//! timeouts are involved — a dead FUSE mount fails the `stat` or
//! `readdir` synchronously with the transport error.

use nix::errno::Errno;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Probe failure diagnostics.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("path does not exist: {0}")]
    Missing(PathBuf),
    #[error("transport endpoint is not connected at {0} (filespace daemon is down)")]
    TransportDisconnected(PathBuf),
    #[error("stale file handle at {0} (mount is no longer valid)")]
    StaleHandle(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check that `path` is live and readable.
///
/// Stats the path, then walks its directory listing to force the kernel
/// through the mount's readdir path.
pub fn probe_path(path: &Path) -> Result<(), MountError> {
    fs::metadata(path).map_err(|e| classify(path, e))?;
    let entries = fs::read_dir(path).map_err(|e| classify(path, e))?;
    for entry in entries {
        entry.map_err(|e| classify(path, e))?;
    }
    Ok(())
}

fn classify(path: &Path, err: io::Error) -> MountError {
    match err.raw_os_error() {
        Some(code) if code == Errno::ENOTCONN as i32 => {
            MountError::TransportDisconnected(path.to_path_buf())
        }
        Some(code) if code == Errno::ESTALE as i32 => MountError::StaleHandle(path.to_path_buf()),
        _ if err.kind() == io::ErrorKind::NotFound => MountError::Missing(path.to_path_buf()),
        _ => MountError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    }
}

#[cfg(test)]
#[path = "mount_tests.rs"]
mod tests;
