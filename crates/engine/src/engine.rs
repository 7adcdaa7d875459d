// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine: job lifecycle state machine and run supervision.
//!
//! A job is `Idle` until a start request passes preflight, `Running`
//! while its worker pool is live, and lands in exactly one of
//! `Completed` / `Failed` / `Stopped`. Each run gets its own progress
//! record, cancellation token, and child-process registry; jobs never
//! share run state.

use crate::bus::ProgressBus;
use crate::distribute::distribute;
use crate::dry_run::{self, DryRunReport};
use crate::error::EngineError;
use crate::error_log;
use crate::preflight;
use crate::scan;
use crate::worker::{self, WorkerCtx};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use syncd_adapters::{base_options, probe_path, send_sigkill, send_sigterm, CHILD_GRACE};
use syncd_core::{
    format_rate, Clock, IdGen, JobId, JobStatus, Progress, RunStats, SyncJob, SystemClock,
    UuidIdGen, WorkerProgress, WorkerStatus,
};
use syncd_storage::{IssueStore, JobStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Engine-level configuration, owned by the composition root.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Transfer tool binary; rsync-compatible.
    pub transfer_tool: String,
    /// Filespace mount point probed before and during every run.
    pub mount_path: PathBuf,
    /// Directory receiving `errors.log`.
    pub log_dir: PathBuf,
}

/// Per-run transient state. Reset on every start, cleared on every
/// terminal transition.
struct RunTracking {
    cancel: CancellationToken,
    children: Arc<Mutex<Vec<u32>>>,
    task: Option<JoinHandle<()>>,
}

/// Supervises sync job runs.
pub struct SyncEngine<C: Clock = SystemClock, G: IdGen = UuidIdGen> {
    jobs: Arc<JobStore>,
    issues: Arc<IssueStore>,
    bus: Arc<ProgressBus>,
    config: EngineConfig,
    clock: C,
    id_gen: G,
    progress: Mutex<HashMap<JobId, Arc<Mutex<Progress>>>>,
    tracking: Mutex<HashMap<JobId, RunTracking>>,
}

impl SyncEngine {
    /// Engine with the system clock and UUID ids.
    pub fn new(
        jobs: Arc<JobStore>,
        issues: Arc<IssueStore>,
        bus: Arc<ProgressBus>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Self::with_parts(jobs, issues, bus, config, SystemClock, UuidIdGen)
    }
}

impl<C: Clock + 'static, G: IdGen + 'static> SyncEngine<C, G> {
    /// Engine with injected clock and id generation, for tests.
    pub fn with_parts(
        jobs: Arc<JobStore>,
        issues: Arc<IssueStore>,
        bus: Arc<ProgressBus>,
        config: EngineConfig,
        clock: C,
        id_gen: G,
    ) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            issues,
            bus,
            config,
            clock,
            id_gen,
            progress: Mutex::new(HashMap::new()),
            tracking: Mutex::new(HashMap::new()),
        })
    }

    pub fn job_store(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    pub fn issue_store(&self) -> &Arc<IssueStore> {
        &self.issues
    }

    pub fn bus(&self) -> &Arc<ProgressBus> {
        &self.bus
    }

    /// Start a run for a job.
    ///
    /// Rejects when the job is unknown or already running, or when the
    /// filespace mount or the source path fails its health probe. On
    /// success the run task is spawned and the initial snapshot
    /// published.
    pub fn start(self: &Arc<Self>, id: &JobId) -> Result<(), EngineError> {
        let job = self
            .jobs
            .get(id)
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;
        if self.tracking.lock().contains_key(id) || job.is_running() {
            return Err(EngineError::AlreadyRunning(id.clone()));
        }
        probe_path(&self.config.mount_path).map_err(EngineError::MountUnhealthy)?;
        probe_path(Path::new(&job.source_path)).map_err(EngineError::SourceUnhealthy)?;

        let now = self.clock.now_utc();
        let progress = Arc::new(Mutex::new(Progress::begin(id.clone(), now)));
        self.progress.lock().insert(id.clone(), progress.clone());

        let job = self
            .jobs
            .mutate(id, |j| {
                j.status = JobStatus::Running;
                j.last_run_at = Some(now);
            })
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;

        let cancel = CancellationToken::new();
        let children = Arc::new(Mutex::new(Vec::new()));
        {
            // Hold the tracking lock across the spawn so the run task's
            // own cleanup cannot observe a half-inserted entry
            let mut tracking = self.tracking.lock();
            let engine = Arc::clone(self);
            let task = tokio::spawn(engine.run_sync(
                job,
                progress.clone(),
                cancel.clone(),
                children.clone(),
            ));
            tracking.insert(
                id.clone(),
                RunTracking {
                    cancel,
                    children,
                    task: Some(task),
                },
            );
        }

        info!(job_id = %id, "sync started");
        let snapshot = progress.lock().clone();
        self.bus.notify(id, &snapshot);
        Ok(())
    }

    /// Stop a running job: raise the cancellation flag, signal every
    /// tracked child, and wait out the run task within the grace window
    /// before killing stragglers.
    pub async fn stop(&self, id: &JobId) -> Result<(), EngineError> {
        let (children, task) = {
            let mut tracking = self.tracking.lock();
            let entry = tracking
                .get_mut(id)
                .ok_or_else(|| EngineError::NotRunning(id.clone()))?;
            entry.cancel.cancel();
            (entry.children.clone(), entry.task.take())
        };

        let now = self.clock.now_utc();
        if let Some(progress) = self.progress_handle(id) {
            let snapshot = {
                let mut p = progress.lock();
                p.current_file = Some("Stopping...".to_string());
                for w in &mut p.workers {
                    if w.status == WorkerStatus::Running {
                        w.status = WorkerStatus::Stopping;
                    }
                }
                p.updated_at = Some(now);
                p.clone()
            };
            self.bus.notify(id, &snapshot);
        }

        for pid in children.lock().iter() {
            send_sigterm(*pid);
        }

        if let Some(task) = task {
            let abort = task.abort_handle();
            if tokio::time::timeout(CHILD_GRACE, task).await.is_err() {
                warn!(job_id = %id, "run task did not drain in time, killing children");
                for pid in children.lock().iter() {
                    send_sigkill(*pid);
                }
                abort.abort();
            }
        }

        self.tracking.lock().remove(id);
        self.jobs
            .mutate(id, |j| j.set_outcome(JobStatus::Stopped, "Stopped by user"));

        if let Some(progress) = self.progress_handle(id) {
            let snapshot = {
                let mut p = progress.lock();
                p.status = JobStatus::Stopped;
                p.current_file = None;
                p.updated_at = Some(self.clock.now_utc());
                p.clone()
            };
            self.bus.notify(id, &snapshot);
        }

        info!(job_id = %id, "sync stopped");
        Ok(())
    }

    /// Stop every running job.
    pub async fn shutdown(&self) {
        let ids: Vec<JobId> = self.tracking.lock().keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                debug!(job_id = %id, error = %e, "shutdown stop skipped");
            }
        }
    }

    /// Snapshot of a job's live (or most recent) progress.
    pub fn progress(&self, id: &JobId) -> Option<Progress> {
        self.progress_handle(id).map(|p| p.lock().clone())
    }

    /// Ids of jobs with a live run.
    pub fn running_jobs(&self) -> Vec<JobId> {
        self.tracking.lock().keys().cloned().collect()
    }

    /// Plan a job's next run without mutating the destination.
    pub async fn dry_run(&self, id: &JobId) -> Result<DryRunReport, EngineError> {
        let job = self
            .jobs
            .get(id)
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;
        Ok(dry_run::plan(&job, &self.config).await)
    }

    fn progress_handle(&self, id: &JobId) -> Option<Arc<Mutex<Progress>>> {
        self.progress.lock().get(id).cloned()
    }

    /// The run task: preflight, worker pool, aggregation, persistence.
    async fn run_sync(
        self: Arc<Self>,
        job: SyncJob,
        progress: Arc<Mutex<Progress>>,
        cancel: CancellationToken,
        children: Arc<Mutex<Vec<u32>>>,
    ) {
        let started = self.clock.now();
        let result = self
            .run_sync_inner(&job, &progress, &cancel, &children, started)
            .await;

        if let Err(message) = result {
            warn!(job_id = %job.id, error = %message, "sync run failed");
            self.jobs
                .mutate(&job.id, |j| j.set_outcome(JobStatus::Failed, message.clone()));
            let mut p = progress.lock();
            p.status = JobStatus::Failed;
            p.error_message = Some(message);
            p.updated_at = Some(self.clock.now_utc());
        }

        self.tracking.lock().remove(&job.id);
        let snapshot = progress.lock().clone();
        self.bus.notify(&job.id, &snapshot);
    }

    async fn run_sync_inner(
        &self,
        job: &SyncJob,
        progress: &Arc<Mutex<Progress>>,
        cancel: &CancellationToken,
        children: &Arc<Mutex<Vec<u32>>>,
        started: Instant,
    ) -> Result<(), String> {
        let source = PathBuf::from(job.source_path.trim_end_matches('/'));
        let dest = PathBuf::from(job.dest_path.trim_end_matches('/'));

        // Scan the source on the blocking pool
        let items = {
            let source = source.clone();
            let excludes = job.exclude_patterns.clone();
            tokio::task::spawn_blocking(move || scan::top_level_items(&source, &excludes))
                .await
                .map_err(|e| format!("source scan failed: {}", e))?
        };
        let files_total: u64 = items.iter().map(|i| i.files).sum();
        let bytes_total: u64 = items.iter().map(|i| i.bytes).sum();

        let num_workers = items.len().min(job.concurrency as usize).max(1);
        let partitions = distribute(&items, num_workers);

        {
            let mut p = progress.lock();
            p.files_total = files_total;
            p.bytes_total = bytes_total;
            p.workers = partitions
                .iter()
                .enumerate()
                .map(|(i, part)| {
                    WorkerProgress::new(
                        i,
                        part.iter().map(|item| item.name.clone()).collect(),
                        part.iter().map(|item| item.files).sum(),
                        part.iter().map(|item| item.bytes).sum(),
                    )
                })
                .collect();
            p.updated_at = Some(self.clock.now_utc());
        }
        self.publish(&job.id, progress);

        // Pre-flight: filename scan. Advisory — issues never block a run.
        self.set_status_line(&job.id, progress, "Pre-flight: Checking filenames...");
        let issue_count = {
            let job = job.clone();
            let issues = Arc::clone(&self.issues);
            let id_gen = self.id_gen.clone();
            let now = self.clock.now_utc();
            tokio::task::spawn_blocking(move || {
                preflight::scan_source(&job, &issues, &id_gen, now)
            })
            .await
            .map_err(|e| format!("filename scan failed: {}", e))?
        };
        if issue_count > 0 {
            self.set_status_line(
                &job.id,
                progress,
                format!("Pre-flight: {} filename issue(s) found", issue_count),
            );
        }

        // Pre-flight: destination directory skeleton
        self.set_status_line(&job.id, progress, "Pre-flight: Creating directories...");
        let dir_count = {
            let source = source.clone();
            let dest = dest.clone();
            let excludes = job.exclude_patterns.clone();
            tokio::task::spawn_blocking(move || {
                preflight::create_dest_dirs(&source, &dest, &excludes)
            })
            .await
            .map_err(|e| format!("directory preflight failed: {}", e))?
        };
        self.set_status_line(
            &job.id,
            progress,
            format!("Pre-flight: Created {} directories", dir_count),
        );

        let opts = base_options(&job.rsync_options, &job.exclude_patterns);

        // Worker pool. Errors never cancel siblings — each worker reacts
        // to the shared cancellation token on its own.
        let mut handles = Vec::with_capacity(num_workers);
        for (worker_id, partition) in partitions.into_iter().enumerate() {
            let ctx = WorkerCtx {
                worker_id,
                items: partition,
                source: source.clone(),
                dest: dest.clone(),
                opts: opts.clone(),
                tool: self.config.transfer_tool.clone(),
                mount_path: self.config.mount_path.clone(),
                job_id: job.id.clone(),
                progress: Arc::clone(progress),
                bus: Arc::clone(&self.bus),
                cancel: cancel.clone(),
                children: Arc::clone(children),
            };
            handles.push(tokio::spawn(worker::run(ctx, self.clock.clone())));
        }

        let mut files_done = 0u64;
        let mut bytes_done = 0u64;
        let mut all_errors = Vec::new();
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(outcome) => {
                    files_done += outcome.files_done;
                    bytes_done += outcome.bytes_done;
                    all_errors.extend(outcome.errors);
                }
                Err(e) => {
                    all_errors.push(format!("[worker {}] task failed: {}", worker_id, e));
                }
            }
        }

        let duration = self.clock.now().duration_since(started).as_secs_f64();
        let stats = RunStats::new(duration, files_done, bytes_done, all_errors.len() as u64);
        let now = self.clock.now_utc();

        if !all_errors.is_empty() {
            error_log::append(&self.config.log_dir, &job.name, &job.id, &all_errors, now);
        }

        if cancel.is_cancelled() {
            // The stop protocol owns the terminal status; just record
            // what actually transferred
            self.jobs.mutate(&job.id, |j| j.record_run(stats, now));
        } else if !all_errors.is_empty() {
            let first = all_errors[0].clone();
            self.jobs.mutate(&job.id, |j| {
                j.set_outcome(JobStatus::Failed, format!("Failed: {}", first));
                j.record_run(stats, now);
            });
            let mut p = progress.lock();
            p.status = JobStatus::Failed;
            p.error_message = Some(first);
            p.current_file = None;
            p.updated_at = Some(now);
        } else {
            let message = format!(
                "Completed: {} files in {:.1}s ({} workers, {})",
                stats.files_synced,
                duration,
                num_workers,
                format_rate(stats.bytes_per_sec)
            );
            self.jobs.mutate(&job.id, |j| {
                j.set_outcome(JobStatus::Completed, message);
                j.record_run(stats, now);
            });
            let mut p = progress.lock();
            p.status = JobStatus::Completed;
            p.percent_complete = 100.0;
            p.current_file = None;
            p.updated_at = Some(now);
        }
        Ok(())
    }

    fn set_status_line(
        &self,
        job_id: &JobId,
        progress: &Arc<Mutex<Progress>>,
        line: impl Into<String>,
    ) {
        {
            let mut p = progress.lock();
            p.current_file = Some(line.into());
            p.updated_at = Some(self.clock.now_utc());
        }
        self.publish(job_id, progress);
    }

    fn publish(&self, job_id: &JobId, progress: &Arc<Mutex<Progress>>) {
        let snapshot = progress.lock().clone();
        self.bus.notify(job_id, &snapshot);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
