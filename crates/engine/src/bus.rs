// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress bus.
//!
//! Subscribers register a sink; the engine and workers publish snapshots
//! at run milestones plus rate-limited mid-transfer updates. Delivery is
//! serialized per publish call and sink failures are logged so one bad
//! subscriber cannot stall the pipeline. There is no replay — a late
//! subscriber asks the engine for the current snapshot.

use parking_lot::Mutex;
use std::sync::Arc;
use syncd_core::{JobId, Progress};
use thiserror::Error;
use tracing::warn;

/// Errors from progress sinks
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("sink failed: {0}")]
    SinkFailed(String),
}

/// A subscriber to per-job progress snapshots.
///
/// Sinks must be fast and must not block; a sink that errors is logged
/// and skipped for that publish, never unsubscribed.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, job_id: &JobId, progress: &Progress) -> Result<(), PublishError>;
}

/// Registry of progress sinks.
#[derive(Default)]
pub struct ProgressBus {
    sinks: Mutex<Vec<Arc<dyn ProgressSink>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink for all jobs' snapshots.
    pub fn subscribe(&self, sink: Arc<dyn ProgressSink>) {
        self.sinks.lock().push(sink);
    }

    /// Deliver a snapshot to every sink, in registration order.
    pub fn notify(&self, job_id: &JobId, progress: &Progress) {
        // Deliver outside the lock so a slow sink cannot block subscribe
        let sinks: Vec<_> = self.sinks.lock().clone();
        for sink in sinks {
            if let Err(e) = sink.publish(job_id, progress) {
                warn!(job_id = %job_id, error = %e, "progress sink failed");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.lock().len()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
