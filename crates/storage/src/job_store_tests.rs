// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use syncd_core::{Clock, FakeClock, SyncDirection};
use tempfile::tempdir;

fn spec(name: &str) -> JobSpec {
    JobSpec {
        name: name.to_string(),
        source_path: "/data/local".to_string(),
        dest_path: "/data/filespace".to_string(),
        direction: SyncDirection::LocalToFilespace,
        interval_secs: 300,
        concurrency: 2,
        rsync_options: "-avz".to_string(),
        exclude_patterns: vec![],
        enabled: true,
    }
}

fn job_id(n: u32) -> JobId {
    JobId::new(format!("job-{}", n))
}

#[test]
fn create_and_reload_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    let a = store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();
    let b = store.create(job_id(2), spec("beta"), clock.now_utc()).unwrap();

    let reloaded = JobStore::load(&path);
    let jobs = reloaded.list();
    assert_eq!(jobs.len(), 2);
    // Insertion order preserved
    assert_eq!(jobs[0].id, a.id);
    assert_eq!(jobs[1].id, b.id);
    assert_eq!(jobs[0].name, "alpha");
    assert_eq!(jobs[1].concurrency, b.concurrency);
}

#[test]
fn load_forces_running_jobs_to_idle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();
    store.mutate(&job_id(1), |job| job.status = JobStatus::Running);

    let reloaded = JobStore::load(&path);
    assert_eq!(reloaded.get(&job_id(1)).unwrap().status, JobStatus::Idle);
}

#[test]
fn create_rejects_invalid_spec() {
    let dir = tempdir().unwrap();
    let store = JobStore::load(dir.path().join("jobs.json"));
    let clock = FakeClock::new();

    let mut bad = spec("x");
    bad.concurrency = 0;
    assert!(store.create(job_id(1), bad, clock.now_utc()).is_err());
    assert!(store.list().is_empty());
}

#[test]
fn update_patches_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();

    let patch = JobPatch {
        name: Some("renamed".to_string()),
        ..JobPatch::default()
    };
    let updated = store.update(&job_id(1), patch, clock.now_utc()).unwrap();
    assert_eq!(updated.unwrap().name, "renamed");

    let reloaded = JobStore::load(&path);
    assert_eq!(reloaded.get(&job_id(1)).unwrap().name, "renamed");
}

#[test]
fn update_unknown_job_is_none() {
    let dir = tempdir().unwrap();
    let store = JobStore::load(dir.path().join("jobs.json"));
    let clock = FakeClock::new();
    let result = store.update(&job_id(9), JobPatch::default(), clock.now_utc());
    assert!(result.unwrap().is_none());
}

#[test]
fn delete_removes_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();
    assert!(store.delete(&job_id(1)));
    assert!(!store.delete(&job_id(1)));

    let reloaded = JobStore::load(&path);
    assert!(reloaded.list().is_empty());
}

#[test]
fn save_refreshes_backup_with_previous_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();
    // Second save: the backup now holds the single-job document
    store.create(job_id(2), spec("beta"), clock.now_utc()).unwrap();

    let backup = path.with_extension("backup");
    assert!(backup.exists());
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(doc["jobs"].as_array().unwrap().len(), 1);
    let canonical: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(canonical["jobs"].as_array().unwrap().len(), 2);
}

#[test]
fn corrupt_canonical_falls_back_to_backup_and_preserves_forensics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();
    store.create(job_id(2), spec("beta"), clock.now_utc()).unwrap();

    // Simulate a torn canonical document
    fs::write(&path, b"{ \"jobs\": [ garbage").unwrap();

    let reloaded = JobStore::load(&path);
    // Backup held the one-job document from before the second save
    assert_eq!(reloaded.list().len(), 1);
    assert_eq!(reloaded.get(&job_id(1)).unwrap().name, "alpha");

    let corrupted = path.with_extension("corrupted");
    assert_eq!(fs::read(&corrupted).unwrap(), b"{ \"jobs\": [ garbage");
}

#[test]
fn corrupt_canonical_without_backup_starts_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    fs::write(&path, b"\xff\xfenot json").unwrap();

    let store = JobStore::load(&path);
    assert!(store.list().is_empty());
}

#[test]
fn stale_tmp_file_is_ignored_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();

    // Crash after writing the temp file but before the rename
    fs::write(path.with_extension("tmp"), b"partial write").unwrap();

    let reloaded = JobStore::load(&path);
    assert_eq!(reloaded.list().len(), 1);
}

#[test]
fn atomic_save_leaves_no_tmp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn save_failure_keeps_memory_authoritative() {
    let dir = tempdir().unwrap();
    // Parent "directory" is a file, so every save fails
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    let path = blocker.join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();

    assert_eq!(store.list().len(), 1);
    assert_eq!(store.get(&job_id(1)).unwrap().name, "alpha");
}

#[test]
fn mutate_applies_under_lock_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = FakeClock::new();

    let store = JobStore::load(&path);
    store.create(job_id(1), spec("alpha"), clock.now_utc()).unwrap();

    let updated = store.mutate(&job_id(1), |job| {
        job.set_outcome(JobStatus::Completed, "Completed: 3 files in 1.0s");
    });
    assert_eq!(updated.unwrap().status, JobStatus::Completed);
    assert!(store.mutate(&job_id(9), |_| {}).is_none());
}
