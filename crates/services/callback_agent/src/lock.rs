// --- File: crates/services/callback_agent/src/lock.rs ---
//! Single-instance pidfile lock.
//!
//! Two concurrent main loops would each read the record file before the
//! other persisted its bookings and double-book every call, so `run`
//! refuses to start while another live instance holds the lock. A lock
//! left behind by a crashed process is reclaimed.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("another main loop is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },
    #[error("pidfile I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive lock held for the lifetime of the main loop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Take the lock, reclaiming it from a dead holder if necessary.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        if let Some(pid) = Self::holder(&path)? {
            if pid_alive(pid) {
                return Err(LockError::AlreadyRunning { pid });
            }
            warn!(pid, path = %path.display(), "reclaiming stale pidfile from dead process");
            std::fs::remove_file(&path)?;
        }

        let pid = std::process::id();
        std::fs::write(&path, pid.to_string())?;
        Ok(InstanceLock { path, pid })
    }

    /// The pid currently recorded in the lock file, if any. An unreadable
    /// pid is treated as no holder.
    pub fn holder(path: &Path) -> Result<Option<u32>, LockError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(contents.trim().parse().ok()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// True when the lock file names a live process.
    pub fn held_by_live_process(path: &Path) -> Result<bool, LockError> {
        Ok(Self::holder(path)?.is_some_and(pid_alive))
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Only remove the file if it is still ours.
        if let Ok(Some(pid)) = Self::holder(&self.path) {
            if pid == self.pid {
                std::fs::remove_file(&self.path).ok();
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

// Without procfs there is no portable liveness probe; assume the holder
// is alive and make the operator delete the pidfile by hand.
#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    true
}
