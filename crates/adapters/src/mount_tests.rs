// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn healthy_directory_passes() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    assert!(probe_path(dir.path()).is_ok());
}

#[test]
fn empty_directory_passes() {
    let dir = tempdir().unwrap();
    assert!(probe_path(dir.path()).is_ok());
}

#[test]
fn missing_path_reports_missing() {
    let dir = tempdir().unwrap();
    let gone = dir.path().join("nope");
    assert!(matches!(probe_path(&gone), Err(MountError::Missing(_))));
}

#[test]
fn unreadable_path_reports_io() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, b"x").unwrap();
    // A plain file fails the listing step
    assert!(matches!(probe_path(&file), Err(MountError::Io { .. })));
}

#[test]
fn transport_errno_maps_to_disconnected() {
    let err = io::Error::from_raw_os_error(Errno::ENOTCONN as i32);
    let classified = classify(Path::new("/mnt/filespace"), err);
    assert!(matches!(classified, MountError::TransportDisconnected(_)));
    assert!(classified
        .to_string()
        .contains("transport endpoint is not connected"));
}

#[test]
fn stale_errno_maps_to_stale_handle() {
    let err = io::Error::from_raw_os_error(Errno::ESTALE as i32);
    let classified = classify(Path::new("/mnt/filespace"), err);
    assert!(matches!(classified, MountError::StaleHandle(_)));
}
