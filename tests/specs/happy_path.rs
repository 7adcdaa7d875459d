//! S1 — a three-file source syncs to completion over two workers.

use crate::prelude::*;
use syncd_core::{JobStatus, WorkerStatus};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_files_two_workers_complete() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("big.bin", 1000);
    ws.write_source_file("mid.bin", 600);
    ws.write_source_file("small.bin", 400);
    let id = ws.job("s1", 2, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let job = ws.engine.job_store().get(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let stats = job.last_run_stats.unwrap();
    assert_eq!(stats.files_synced, 3);
    assert_eq!(stats.bytes_transferred, 2000);
    assert_eq!(stats.errors, 0);

    let progress = ws.engine.progress(&id).unwrap();
    assert_eq!(progress.percent_complete, 100.0);
    assert_eq!(progress.workers.len(), 2);
    assert_eq!(progress.workers[0].items, vec!["big.bin"]);
    assert_eq!(progress.workers[1].items, vec!["mid.bin", "small.bin"]);
    assert!(progress
        .workers
        .iter()
        .all(|w| w.status == WorkerStatus::Completed));

    // Progress sum invariant held at the final publish
    let (_, last) = ws.sink.snapshots().into_iter().last().unwrap();
    let worker_files: u64 = last.workers.iter().map(|w| w.files_transferred).sum();
    assert_eq!(last.files_transferred, worker_files);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_snapshot_keeps_the_sum_invariant() {
    let ws = Workspace::new("exit 0");
    for i in 0..6 {
        ws.write_source_file(&format!("f{i}.bin"), 100 * (i + 1));
    }
    let id = ws.job("sum", 3, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    for (_, p) in ws.sink.snapshots() {
        let files: u64 = p.workers.iter().map(|w| w.files_transferred).sum();
        let bytes: u64 = p.workers.iter().map(|w| w.bytes_transferred).sum();
        assert_eq!(p.files_transferred, files);
        assert_eq!(p.bytes_transferred, bytes);
    }
}
