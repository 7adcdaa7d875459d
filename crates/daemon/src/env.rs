// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine state directory (set SYNCD_STATE_DIR or HOME)")]
    NoStateDir,
}

/// Daemon configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filespace mount point (`SYNCD_MOUNT_POINT`, default `/data/filespace`).
    pub mount_path: PathBuf,
    /// Transfer tool binary (`SYNCD_TRANSFER_TOOL`, default `rsync`).
    pub transfer_tool: String,
    /// Persisted job definitions.
    pub jobs_file: PathBuf,
    /// Persisted filename issues.
    pub issues_file: PathBuf,
    /// Error log directory (`SYNCD_LOG_DIR`, default `<state>/log`).
    pub log_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let state = state_dir()?;
        let config_dir = match std::env::var("SYNCD_CONFIG_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => state.clone(),
        };
        Ok(Self {
            mount_path: PathBuf::from(
                std::env::var("SYNCD_MOUNT_POINT")
                    .unwrap_or_else(|_| "/data/filespace".to_string()),
            ),
            transfer_tool: std::env::var("SYNCD_TRANSFER_TOOL")
                .unwrap_or_else(|_| "rsync".to_string()),
            jobs_file: config_dir.join("jobs.json"),
            issues_file: config_dir.join("filename_issues.json"),
            log_dir: match std::env::var("SYNCD_LOG_DIR") {
                Ok(dir) => PathBuf::from(dir),
                Err(_) => state.join("log"),
            },
        })
    }
}

/// Resolve state directory: SYNCD_STATE_DIR > XDG_STATE_HOME/syncd >
/// ~/.local/state/syncd
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("SYNCD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("syncd"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/syncd"))
}
