// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! syncd-engine: The sync job engine.
//!
//! Orchestrates a run end to end: source scan, item distribution across a
//! worker pool, filename preflight, destination skeleton, parallel
//! transfer workers with fail-fast mount handling, progress aggregation
//! over the bus, and durable outcome recording.

pub mod bus;
pub mod distribute;
pub mod dry_run;
pub mod engine;
pub mod error;
pub mod error_log;
pub mod preflight;
pub mod scan;
mod worker;

#[cfg(any(test, feature = "test-support"))]
mod fake_sink;
#[cfg(test)]
mod test_helpers;
#[cfg(any(test, feature = "test-support"))]
pub use fake_sink::CollectingSink;

pub use bus::{ProgressBus, ProgressSink, PublishError};
pub use distribute::distribute;
pub use dry_run::{DryRunReport, MAX_REPORT_ITEMS};
pub use engine::{EngineConfig, SyncEngine};
pub use error::EngineError;
pub use preflight::{RenameError, RenameSummary};
pub use scan::ScanItem;
