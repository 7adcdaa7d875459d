//! Job definitions and run history survive restarts; recovery falls
//! back to the backup when the canonical document is torn.

use crate::prelude::*;
use std::fs;
use syncd_core::JobStatus;
use syncd_storage::JobStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_history_survives_a_restart() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("big.bin", 1000);
    let id = ws.job("restart", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    // "Restart": load a fresh store from the same file
    let reloaded = JobStore::load(ws.dir.path().join("jobs.json"));
    let job = reloaded.get(&id).unwrap();
    // Terminal status is not persisted as-is: every load starts idle
    assert_eq!(job.status, JobStatus::Idle);
    assert_eq!(job.last_run_status, Some(JobStatus::Completed));
    assert_eq!(job.run_count, 1);
    assert_eq!(job.last_run_stats.unwrap().files_synced, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn torn_jobs_file_recovers_from_backup() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("big.bin", 1000);
    let id = ws.job("torn", 1, &[]);

    // Two runs so the backup holds a one-run history
    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;
    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let jobs_file = ws.dir.path().join("jobs.json");
    fs::write(&jobs_file, b"{ torn mid-write").unwrap();

    let reloaded = JobStore::load(&jobs_file);
    let job = reloaded.get(&id).unwrap();
    assert_eq!(job.name, "job-torn");
    // The forensic copy of the torn document is preserved
    assert!(ws.dir.path().join("jobs.corrupted").exists());
}
