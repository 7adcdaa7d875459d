//! S5 — a user stop drains the pool promptly and leaves no orphans.

use crate::prelude::*;
use std::time::{Duration, Instant};
use syncd_core::{JobStatus, WorkerStatus};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stop_request_drains_slow_workers() {
    // Each item would take 10 s; the run is stopped long before that
    let ws = Workspace::new("sleep 10");
    ws.write_source_file("big.bin", 1000);
    ws.write_source_file("mid.bin", 600);
    let id = ws.job("s5", 2, &[]);

    ws.engine.start(&id).unwrap();
    let engine = ws.engine.clone();
    let probe = id.clone();
    wait_until(
        move || {
            engine
                .progress(&probe)
                .is_some_and(|p| p.workers.iter().any(|w| w.status == WorkerStatus::Running))
        },
        SPEC_WAIT_MAX,
    )
    .await;

    let stop_started = Instant::now();
    ws.engine.stop(&id).await.unwrap();
    // Grace window plus poll slack, nowhere near the 10 s transfers
    assert!(stop_started.elapsed() < Duration::from_secs(8));

    let job = ws.engine.job_store().get(&id).unwrap();
    assert_eq!(job.status, JobStatus::Stopped);
    assert_eq!(job.last_run_message.as_deref(), Some("Stopped by user"));
    assert!(ws.engine.running_jobs().is_empty());

    let progress = ws.engine.progress(&id).unwrap();
    assert_eq!(progress.status, JobStatus::Stopped);
    assert!(progress
        .workers
        .iter()
        .all(|w| matches!(w.status, WorkerStatus::Stopped | WorkerStatus::Stopping)));

    // The run records a (zero-progress) run, not an error
    let stats = job.last_run_stats.unwrap();
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.files_synced, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_rejects_idle_job() {
    let ws = Workspace::new("exit 0");
    let id = ws.job("idle", 1, &[]);
    assert!(ws.engine.stop(&id).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stopped_job_can_run_again_to_completion() {
    let ws = Workspace::new("sleep 10");
    ws.write_source_file("big.bin", 1000);
    let id = ws.job("again", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.engine.stop(&id).await.unwrap();

    // Swap in an instant tool by rewriting the script in place
    write_tool(ws.dir.path(), "exit 0");
    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let job = ws.engine.job_store().get(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.run_count, 2);
}
