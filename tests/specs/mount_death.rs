//! S6 — a transport-disconnected signature in one worker's output
//! fails the whole job fast.

use crate::prelude::*;
use std::fs;
use syncd_core::JobStatus;

const TRANSPORT_LINE: &str =
    "rsync: write failed: Transport endpoint is not connected (107)";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transport_error_cancels_all_workers() {
    let ws = Workspace::new(&format!(
        "case \"$@\" in *big.bin*) echo '{TRANSPORT_LINE}'; sleep 10;; *) sleep 10;; esac"
    ));
    ws.write_source_file("big.bin", 1000);
    ws.write_source_file("small.bin", 400);
    let id = ws.job("s6", 2, &[]);

    let started = std::time::Instant::now();
    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;
    // Both 10 s transfers were cut short
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    let job = ws.engine.job_store().get(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job
        .last_run_message
        .unwrap()
        .contains("Transport endpoint is not connected"));

    let log = fs::read_to_string(ws.dir.path().join("log/errors.log")).unwrap();
    assert!(log.contains(TRANSPORT_LINE));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_handle_is_equally_fatal() {
    let ws = Workspace::new(
        "echo 'rsync: opendir \"/mnt/fs/a\" failed: Stale file handle (116)'; sleep 10",
    );
    ws.write_source_file("big.bin", 1000);
    let id = ws.job("stale", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    assert_eq!(
        ws.engine.job_store().get(&id).unwrap().status,
        JobStatus::Failed
    );
}
