// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine

use syncd_adapters::MountError;
use syncd_core::JobId;
use thiserror::Error;

/// Errors reported synchronously to start/stop callers. Job state is
/// unchanged when one of these comes back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("job is already running: {0}")]
    AlreadyRunning(JobId),
    #[error("job is not running: {0}")]
    NotRunning(JobId),
    #[error("filespace mount is unhealthy: {0}")]
    MountUnhealthy(#[source] MountError),
    #[error("source path is unhealthy: {0}")]
    SourceUnhealthy(#[source] MountError),
}
