// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! syncd — directory-sync supervisor daemon.
//!
//! Composition root: loads configuration from the environment, owns the
//! stores and the engine, and shuts running jobs down gracefully on
//! SIGTERM/SIGINT. The HTTP surface is a separate concern and plugs in
//! through the engine and the progress bus.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;

use std::sync::Arc;
use std::time::Instant;
use syncd_core::{format_elapsed, JobId, Progress};
use syncd_engine::{EngineConfig, ProgressBus, ProgressSink, PublishError, SyncEngine};
use syncd_storage::{IssueStore, JobStore};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::env::Config;

/// Bus subscriber that mirrors run milestones into the daemon log.
struct LogSink;

impl ProgressSink for LogSink {
    fn publish(&self, job_id: &JobId, progress: &Progress) -> Result<(), PublishError> {
        debug!(
            job_id = %job_id,
            status = %progress.status,
            files = progress.files_transferred,
            bytes = progress.bytes_transferred,
            percent = progress.percent_complete,
            "progress"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("syncd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("syncd {}", env!("CARGO_PKG_VERSION"));
                println!("Directory-sync supervisor daemon");
                println!();
                println!("USAGE:");
                println!("    syncd");
                println!();
                println!("Configuration comes from the environment:");
                println!("    SYNCD_MOUNT_POINT     filespace mount point (/data/filespace)");
                println!("    SYNCD_TRANSFER_TOOL   transfer tool binary (rsync)");
                println!("    SYNCD_CONFIG_DIR      jobs.json / filename_issues.json location");
                println!("    SYNCD_STATE_DIR       state directory (~/.local/state/syncd)");
                println!("    SYNCD_LOG_DIR         error log directory (<state>/log)");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: syncd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let started = Instant::now();
    let config = Config::load()?;
    info!(
        mount = %config.mount_path.display(),
        jobs_file = %config.jobs_file.display(),
        "starting syncd"
    );

    let jobs = Arc::new(JobStore::load(&config.jobs_file));
    let issues = Arc::new(IssueStore::load(&config.issues_file));
    info!(jobs = jobs.list().len(), "loaded job definitions");

    let bus = Arc::new(ProgressBus::new());
    bus.subscribe(Arc::new(LogSink));

    let engine = SyncEngine::new(
        jobs.clone(),
        issues,
        bus,
        EngineConfig {
            transfer_tool: config.transfer_tool,
            mount_path: config.mount_path,
            log_dir: config.log_dir,
        },
    );

    // Run until asked to stop
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = sigint.recv() => info!("SIGINT received"),
    }

    info!(
        running = engine.running_jobs().len(),
        uptime = %format_elapsed(started.elapsed().as_secs()),
        "shutting down"
    );
    engine.shutdown().await;
    jobs.save();
    info!("bye");
    Ok(())
}
