// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer worker.
//!
//! One worker owns one item partition. Per item it launches the transfer
//! tool as a child process, streams combined output, parses progress
//! lines into its `WorkerProgress` slot, and publishes rate-limited
//! snapshots. Cancellation is polled before each item, at every line,
//! and on a 500 ms read deadline while the child is quiet. A worker that
//! finds the mount dead cancels the whole job.

use crate::bus::ProgressBus;
use crate::scan::ScanItem;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Instant;
use syncd_adapters::{
    is_error_line, is_mount_death, item_command, parse_progress, probe_path, spawn_merged,
    terminate_child, PROGRESS_READ_DEADLINE,
};
use syncd_core::{Clock, JobId, Progress, WorkerProgress, WorkerStatus};
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::net::unix::pipe;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Everything a worker needs for its partition.
pub(crate) struct WorkerCtx {
    pub worker_id: usize,
    pub items: Vec<ScanItem>,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub opts: Vec<String>,
    pub tool: String,
    pub mount_path: PathBuf,
    pub job_id: JobId,
    pub progress: Arc<Mutex<Progress>>,
    pub bus: Arc<ProgressBus>,
    pub cancel: CancellationToken,
    /// Shared per-job registry of live child pids, drained by the stop
    /// protocol.
    pub children: Arc<Mutex<Vec<u32>>>,
}

/// What a worker hands back to the aggregation step: completed-item
/// totals only — partial bytes of a failed item are visible in the
/// progress record but not counted here.
#[derive(Debug, Default)]
pub(crate) struct WorkerOutcome {
    pub files_done: u64,
    pub bytes_done: u64,
    pub errors: Vec<String>,
}

/// Run a worker over its partition to a terminal status.
pub(crate) async fn run<C: Clock>(ctx: WorkerCtx, clock: C) -> WorkerOutcome {
    Worker {
        ctx,
        clock,
        files_done: 0,
        bytes_done: 0,
        errors: Vec::new(),
        last_publish: None,
    }
    .run()
    .await
}

enum ItemEnd {
    /// Move on to the next item
    Continue,
    /// Cancellation observed; stop cleanly
    Stopped,
    /// Mount death; the whole job is being cancelled
    Fatal,
}

enum StreamEnd {
    Exited(ExitStatus),
    Cancelled,
    MountDead,
}

struct Worker<C: Clock> {
    ctx: WorkerCtx,
    clock: C,
    files_done: u64,
    bytes_done: u64,
    errors: Vec<String>,
    last_publish: Option<Instant>,
}

impl<C: Clock> Worker<C> {
    async fn run(mut self) -> WorkerOutcome {
        self.set_worker(|w| w.status = WorkerStatus::Running);
        self.publish();

        let items = std::mem::take(&mut self.ctx.items);
        let mut terminal = None;
        for item in &items {
            if self.ctx.cancel.is_cancelled() {
                terminal = Some(WorkerStatus::Stopped);
                break;
            }
            if let Err(e) = probe_path(&self.ctx.mount_path) {
                self.errors.push(format!(
                    "[worker {}] mount check failed before {}: {}",
                    self.ctx.worker_id, item.name, e
                ));
                self.ctx.cancel.cancel();
                terminal = Some(WorkerStatus::Failed);
                break;
            }
            match self.run_item(item).await {
                ItemEnd::Continue => {}
                ItemEnd::Stopped => {
                    terminal = Some(WorkerStatus::Stopped);
                    break;
                }
                ItemEnd::Fatal => {
                    terminal = Some(WorkerStatus::Failed);
                    break;
                }
            }
        }

        let status = terminal.unwrap_or(if self.errors.is_empty() {
            WorkerStatus::Completed
        } else {
            WorkerStatus::Failed
        });
        self.set_worker(|w| {
            w.status = status;
            w.current_item = None;
            w.rate = None;
        });
        self.publish();

        WorkerOutcome {
            files_done: self.files_done,
            bytes_done: self.bytes_done,
            errors: self.errors,
        }
    }

    async fn run_item(&mut self, item: &ScanItem) -> ItemEnd {
        self.set_worker(|w| w.current_item = Some(item.name.clone()));

        let cmd = item_command(
            &self.ctx.tool,
            &self.ctx.opts,
            &self.ctx.source,
            &self.ctx.dest,
            &item.name,
            item.is_dir,
        );
        let (mut child, output) = match spawn_merged(cmd) {
            Ok(spawned) => spawned,
            Err(e) => {
                self.errors.push(format!(
                    "[worker {}] failed to launch transfer for {}: {}",
                    self.ctx.worker_id, item.name, e
                ));
                return ItemEnd::Continue;
            }
        };

        let pid = child.id();
        if let Some(pid) = pid {
            self.ctx.children.lock().push(pid);
        }

        let end = self.stream_child(&mut child, output).await;

        if let Some(pid) = pid {
            self.ctx.children.lock().retain(|p| *p != pid);
        }

        match end {
            StreamEnd::Cancelled => ItemEnd::Stopped,
            StreamEnd::MountDead => ItemEnd::Fatal,
            StreamEnd::Exited(status) if status.success() => {
                self.files_done += item.files;
                self.bytes_done += item.bytes;
                let (files_done, bytes_done) = (self.files_done, self.bytes_done);
                self.set_worker(|w| {
                    w.files_transferred = files_done;
                    w.bytes_transferred = bytes_done;
                });
                self.publish();
                ItemEnd::Continue
            }
            StreamEnd::Exited(status) => {
                if let Some(signal) = status.signal() {
                    // Signal exits are the engine's own doing, not an
                    // item failure
                    debug!(
                        worker = self.ctx.worker_id,
                        item = %item.name,
                        signal,
                        "transfer terminated by signal"
                    );
                    if self.ctx.cancel.is_cancelled() {
                        return ItemEnd::Stopped;
                    }
                } else {
                    self.errors.push(format!(
                        "[worker {}] failed to sync {}: exit code {}",
                        self.ctx.worker_id,
                        item.name,
                        status.code().unwrap_or(-1)
                    ));
                }
                ItemEnd::Continue
            }
        }
    }

    /// Stream the child's combined output line by line until the pipe
    /// closes, then reap it. The read deadline bounds how long we go
    /// between cancellation checks while the child is quiet.
    async fn stream_child(&mut self, child: &mut Child, output: pipe::Receiver) -> StreamEnd {
        let mut lines = BufReader::new(output).lines();

        loop {
            if self.ctx.cancel.is_cancelled() {
                terminate_child(child).await;
                return StreamEnd::Cancelled;
            }
            let mut fatal = false;
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => fatal = self.handle_line(&line),
                    _ => break,
                },
                _ = tokio::time::sleep(PROGRESS_READ_DEADLINE) => {}
            }
            if fatal {
                terminate_child(child).await;
                return StreamEnd::MountDead;
            }
        }

        match child.wait().await {
            Ok(status) => StreamEnd::Exited(status),
            Err(e) => {
                warn!(worker = self.ctx.worker_id, error = %e, "failed to reap child");
                StreamEnd::Exited(ExitStatus::from_raw(256))
            }
        }
    }

    /// Handle one output line. Returns true on a fatal mount-death
    /// signature, with the cancellation flag already raised.
    fn handle_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        if is_error_line(line) {
            self.errors
                .push(format!("[worker {}] {}", self.ctx.worker_id, line));
            if is_mount_death(line) {
                self.ctx.cancel.cancel();
                return true;
            }
            return false;
        }
        if let Some(parsed) = parse_progress(line) {
            let bytes_base = self.bytes_done;
            {
                let mut progress = self.ctx.progress.lock();
                progress.transfer_rate = Some(parsed.rate.clone());
                if parsed.eta.is_some() {
                    progress.eta = parsed.eta.clone();
                }
                if let Some(w) = progress.workers.get_mut(self.ctx.worker_id) {
                    w.bytes_transferred = bytes_base + parsed.bytes;
                    w.rate = Some(parsed.rate);
                }
            }
            self.publish_throttled();
        }
        false
    }

    fn set_worker(&self, f: impl FnOnce(&mut WorkerProgress)) {
        let mut progress = self.ctx.progress.lock();
        if let Some(w) = progress.workers.get_mut(self.ctx.worker_id) {
            f(w);
        }
    }

    /// Recompute aggregates and publish a snapshot.
    fn publish(&mut self) {
        let snapshot = {
            let mut progress = self.ctx.progress.lock();
            progress.recompute_totals(self.clock.now_utc());
            progress.clone()
        };
        self.ctx.bus.notify(&self.ctx.job_id, &snapshot);
        self.last_publish = Some(self.clock.now());
    }

    /// Publish at most once per read deadline; mid-transfer updates are
    /// best-effort.
    fn publish_throttled(&mut self) {
        let due = match self.last_publish {
            None => true,
            Some(at) => self.clock.now().duration_since(at) >= PROGRESS_READ_DEADLINE,
        };
        if due {
            self.publish();
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
