// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collecting progress sink for tests.

use crate::bus::{ProgressSink, PublishError};
use parking_lot::Mutex;
use std::sync::Arc;
use syncd_core::{JobId, Progress};

/// Records every published snapshot; optionally fails each publish to
/// exercise sink error isolation.
#[derive(Default)]
pub struct CollectingSink {
    snapshots: Arc<Mutex<Vec<(JobId, Progress)>>>,
    fail: bool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every publish fails.
    pub fn failing() -> Self {
        Self {
            snapshots: Arc::default(),
            fail: true,
        }
    }

    /// All snapshots seen so far, in delivery order.
    pub fn snapshots(&self) -> Vec<(JobId, Progress)> {
        self.snapshots.lock().clone()
    }

    /// The most recent snapshot for a job.
    pub fn last_for(&self, job_id: &JobId) -> Option<Progress> {
        self.snapshots
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| id == job_id)
            .map(|(_, p)| p.clone())
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().len()
    }
}

impl ProgressSink for CollectingSink {
    fn publish(&self, job_id: &JobId, progress: &Progress) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::SinkFailed("collecting sink set to fail".into()));
        }
        self.snapshots
            .lock()
            .push((job_id.clone(), progress.clone()));
        Ok(())
    }
}
