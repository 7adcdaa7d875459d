//! Test helpers for behavioral specifications.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use syncd_core::{Clock, JobId, JobSpec, JobStatus, SequentialIdGen, SyncDirection, SystemClock};
use syncd_engine::{CollectingSink, EngineConfig, ProgressBus, SyncEngine};
use syncd_storage::{IssueStore, JobStore};
use tempfile::TempDir;

pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(15);

pub type SpecEngine = Arc<SyncEngine<SystemClock, SequentialIdGen>>;

/// One engine over a temp workspace with a scripted transfer tool.
pub struct Workspace {
    pub dir: TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub mount: PathBuf,
    pub engine: SpecEngine,
    pub sink: Arc<CollectingSink>,
}

impl Workspace {
    /// Build a workspace whose transfer tool runs `tool_body` as a shell
    /// script.
    pub fn new(tool_body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        let dest = dir.path().join("dst");
        let mount = dir.path().join("mount");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::create_dir_all(&mount).unwrap();

        let tool = write_tool(dir.path(), tool_body);
        let jobs = Arc::new(JobStore::load(dir.path().join("jobs.json")));
        let issues = Arc::new(IssueStore::load(dir.path().join("filename_issues.json")));
        let bus = Arc::new(ProgressBus::new());
        let sink = Arc::new(CollectingSink::new());
        bus.subscribe(sink.clone());

        let engine = SyncEngine::with_parts(
            jobs,
            issues,
            bus,
            EngineConfig {
                transfer_tool: tool.to_string_lossy().into_owned(),
                mount_path: mount.clone(),
                log_dir: dir.path().join("log"),
            },
            SystemClock,
            SequentialIdGen::new("issue"),
        );

        Self {
            source,
            dest,
            mount,
            engine,
            sink,
            dir,
        }
    }

    /// Create a job over this workspace's source/dest.
    pub fn job(&self, id: &str, concurrency: u32, excludes: &[&str]) -> JobId {
        let job_id = JobId::new(id);
        let spec = JobSpec {
            name: format!("job-{id}"),
            source_path: self.source.to_string_lossy().into_owned(),
            dest_path: self.dest.to_string_lossy().into_owned(),
            direction: SyncDirection::LocalToFilespace,
            interval_secs: 300,
            concurrency,
            rsync_options: "-a".to_string(),
            exclude_patterns: excludes.iter().map(|s| s.to_string()).collect(),
            enabled: true,
        };
        self.engine
            .job_store()
            .create(job_id.clone(), spec, SystemClock.now_utc())
            .unwrap();
        job_id
    }

    pub fn write_source_file(&self, name: &str, size: usize) {
        fs::write(self.source.join(name), vec![b'x'; size]).unwrap();
    }

    pub async fn wait_terminal(&self, id: &JobId) {
        let engine = self.engine.clone();
        let id = id.clone();
        wait_until(
            move || {
                engine.running_jobs().is_empty()
                    && engine
                        .job_store()
                        .get(&id)
                        .is_some_and(|j| j.status != JobStatus::Running)
            },
            SPEC_WAIT_MAX,
        )
        .await;
    }
}

/// Write an executable shell script standing in for the transfer tool.
pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-rsync");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Poll until `condition` holds or the deadline passes.
pub async fn wait_until(condition: impl Fn() -> bool, deadline: Duration) {
    let start = Instant::now();
    while !condition() {
        assert!(
            start.elapsed() <= deadline,
            "condition not met within {:?}",
            deadline
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
