//! S2 — greedy balancing of uneven item sizes across three workers.

use crate::prelude::*;
use syncd_core::JobStatus;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn imbalanced_sizes_spread_across_three_workers() {
    let ws = Workspace::new("exit 0");
    // Sizes 9, 8, 5, 4, 2, 2 (in bytes), named so the partition is visible
    for (name, size) in [
        ("a.bin", 9),
        ("b.bin", 8),
        ("c.bin", 5),
        ("d.bin", 4),
        ("e.bin", 2),
        ("f.bin", 2),
    ] {
        ws.write_source_file(name, size);
    }
    let id = ws.job("s2", 3, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let progress = ws.engine.progress(&id).unwrap();
    assert_eq!(progress.workers.len(), 3);
    let loads: Vec<u64> = progress.workers.iter().map(|w| w.bytes_total).collect();
    assert_eq!(loads, vec![11, 10, 9]);
    assert_eq!(ws.engine.job_store().get(&id).unwrap().status, JobStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn more_workers_than_items_clamps_the_pool() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("one.bin", 10);
    ws.write_source_file("two.bin", 20);
    let id = ws.job("clamp", 32, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let progress = ws.engine.progress(&id).unwrap();
    assert_eq!(progress.workers.len(), 2);
}
