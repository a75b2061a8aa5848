//! PID file management for single-instance enforcement.
//!
//! Two watchers sharing one data directory would race on the same snapshot
//! files, so `sitewatch run` holds a PID file at `<data_dir>/sitewatch.pid`
//! for as long as it runs.
//!
//! # Design
//!
//! This is an advisory mechanism, not a hard lock. It detects common cases
//! of accidental multiple instances but cannot prevent all scenarios (e.g.,
//! stale PID files after a crash on systems without `/proc`).

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, WatchError};

/// PID file guard that automatically cleans up on drop.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    /// Write the current PID to `path`.
    ///
    /// Returns an error if a PID file already exists and its process is still
    /// running. A PID file left by a dead process is replaced.
    pub fn acquire_at(path: PathBuf) -> Result<Self> {
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    if let Ok(pid) = content.trim().parse::<u32>() {
                        if pid == std::process::id() || is_process_running(pid) {
                            return Err(WatchError::Precondition(format!(
                                "Watcher already running with PID {}. \
                                 If this is incorrect, remove {} and try again.",
                                pid,
                                path.display()
                            )));
                        }
                        warn!(
                            "Found stale PID file for non-running process {}. Cleaning up.",
                            pid
                        );
                    }
                    let _ = fs::remove_file(&path);
                }
                Err(e) => {
                    warn!("Failed to read PID file: {}. Assuming stale and removing.", e);
                    let _ = fs::remove_file(&path);
                }
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                WatchError::Storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let pid = std::process::id();
        fs::write(&path, pid.to_string()).map_err(|e| {
            WatchError::Storage(format!("Failed to write PID file {}: {}", path.display(), e))
        })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        // Best effort cleanup - don't panic on failure
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove PID file {}: {}", self.path.display(), e);
        }
    }
}

/// Best-effort liveness check through `/proc/<pid>`. Where `/proc` is not
/// available every PID counts as dead, so stale files never block startup.
fn is_process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}
