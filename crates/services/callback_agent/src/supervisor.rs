// --- File: crates/services/callback_agent/src/supervisor.rs ---
//! The watchdog: keeps the main loop alive.
//!
//! An explicit state machine over {Stopped, Running, Restarting}. The
//! watchdog never runs batches itself; it observes the main loop's
//! pidfile and spawns `callback-agent run` when nobody holds it. The
//! pidfile lock inside `run` is what guarantees at most one live main
//! loop, so a watchdog racing a manually-started loop cannot create a
//! second instance.

use crate::lock::{InstanceLock, LockError};
use callback_config::SupervisorConfig;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("cannot locate own executable: {0}")]
    Exe(std::io::Error),
    #[error("failed to spawn main loop: {0}")]
    Spawn(std::io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Running,
    Restarting,
}

impl SupervisorState {
    /// Pure transition step, driven by whether a live main loop holds
    /// the pidfile.
    pub fn next(self, main_loop_alive: bool) -> SupervisorState {
        if main_loop_alive {
            SupervisorState::Running
        } else {
            SupervisorState::Restarting
        }
    }
}

pub struct Supervisor {
    config: SupervisorConfig,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Supervisor {
            config,
            state: SupervisorState::Stopped,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Watch until Ctrl-C. The main loop child is spawned detached and
    /// deliberately outlives the watchdog: stopping the watchdog must
    /// not take the tracker down with it.
    pub async fn supervise(&mut self) -> Result<(), SupervisorError> {
        info!(
            pidfile = %self.config.pidfile,
            check_every_secs = self.config.check_interval_secs,
            "watchdog started"
        );
        loop {
            let alive = InstanceLock::held_by_live_process(Path::new(&self.config.pidfile))?;
            self.state = self.state.next(alive);

            if self.state == SupervisorState::Restarting {
                info!("main loop not running, starting it");
                self.spawn_main_loop()?;
                tokio::time::sleep(Duration::from_secs(self.config.restart_delay_secs)).await;

                if InstanceLock::held_by_live_process(Path::new(&self.config.pidfile))? {
                    info!("main loop started successfully");
                    self.state = SupervisorState::Running;
                } else {
                    warn!(
                        retry_secs = self.config.check_interval_secs,
                        "main loop failed to start, will retry"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.config.check_interval_secs)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("watchdog stopped; main loop left running");
                    self.state = SupervisorState::Stopped;
                    return Ok(());
                }
            }
        }
    }

    fn spawn_main_loop(&self) -> Result<(), SupervisorError> {
        let exe = std::env::current_exe().map_err(SupervisorError::Exe)?;
        Command::new(exe)
            .arg("run")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(SupervisorError::Spawn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_liveness() {
        assert_eq!(
            SupervisorState::Stopped.next(true),
            SupervisorState::Running
        );
        assert_eq!(
            SupervisorState::Stopped.next(false),
            SupervisorState::Restarting
        );
        assert_eq!(
            SupervisorState::Running.next(false),
            SupervisorState::Restarting
        );
        assert_eq!(
            SupervisorState::Restarting.next(true),
            SupervisorState::Running
        );
    }

    #[test]
    fn new_supervisor_is_stopped() {
        let supervisor = Supervisor::new(SupervisorConfig::default());
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }
}
