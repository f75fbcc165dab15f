//! Start/stop state machine driven by the launcher scripts and the PID marker.

use std::time::Duration;

use tokio::time::Instant;

use super::control::{is_process_alive, run_launcher};
use super::pid_file::{read_pid, remove_stale_marker};
use super::PollSettings;
use crate::error::{AppError, Result};
use crate::inventory::Instance;
use crate::paths::AppPaths;
use crate::platform::{SHUTDOWN_SCRIPT, STARTUP_SCRIPT};

/// Poll `probe` every `interval` until it yields a value or `timeout` elapses.
async fn poll_until<T, F>(interval: Duration, timeout: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Issues start/stop commands and derives liveness from the PID marker.
///
/// No process handle is kept between calls: every decision re-reads the marker
/// and checks the OS process table. Callers must not overlap start/stop for
/// the same instance.
#[derive(Debug, Clone)]
pub struct ProcessController {
    paths: AppPaths,
    poll: PollSettings,
}

impl ProcessController {
    pub fn new(paths: AppPaths, poll: PollSettings) -> Self {
        Self { paths, poll }
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    /// Best-effort liveness check; never fails.
    pub fn is_running(&self, pid: u32) -> bool {
        is_process_alive(pid)
    }

    /// Point-in-time read of an instance's marker, without polling.
    pub fn marker_pid(&self, name: &str) -> Option<u32> {
        read_pid(&self.paths.pid_file(name))
    }

    /// Live pid of an instance according to its record or its marker.
    fn live_pid(&self, instance: &Instance) -> Option<u32> {
        instance
            .pid
            .into_iter()
            .chain(self.marker_pid(&instance.name))
            .find(|pid| is_process_alive(*pid))
    }

    /// Launch the instance and wait for its PID marker.
    ///
    /// On timeout `instance.pid` keeps its previous value.
    pub async fn start(&self, instance: &mut Instance) -> Result<u32> {
        if let Some(pid) = self.live_pid(instance) {
            log::warn!("Instance {} already running (pid {})", instance.name, pid);
            return Err(AppError::instance_running(&instance.name));
        }

        let marker = self.paths.pid_file(&instance.name);
        remove_stale_marker(&marker);

        run_launcher(&self.paths.instance_bin_dir(&instance.name), STARTUP_SCRIPT).await?;

        let pid = poll_until(self.poll.interval, self.poll.start_timeout, || {
            read_pid(&marker)
        })
        .await
        .ok_or_else(|| {
            log::error!(
                "Instance {} did not write {:?} within {}s",
                instance.name,
                marker,
                self.poll.start_timeout.as_secs()
            );
            AppError::timeout("start", self.poll.start_timeout.as_secs())
        })?;

        instance.pid = Some(pid);
        log::info!("Instance {} started (pid: {})", instance.name, pid);
        Ok(pid)
    }

    /// Shut the instance down and wait until its marker is gone and the process exited.
    ///
    /// On timeout `instance.pid` keeps its previous value.
    pub async fn stop(&self, instance: &mut Instance) -> Result<()> {
        let Some(last_pid) = self.live_pid(instance) else {
            return Err(AppError::instance_not_running(&instance.name));
        };

        run_launcher(&self.paths.instance_bin_dir(&instance.name), SHUTDOWN_SCRIPT).await?;

        let marker = self.paths.pid_file(&instance.name);
        poll_until(self.poll.interval, self.poll.stop_timeout, || {
            (read_pid(&marker).is_none() && !is_process_alive(last_pid)).then_some(())
        })
        .await
        .ok_or_else(|| {
            log::error!(
                "Instance {} (pid {}) did not stop within {}s",
                instance.name,
                last_pid,
                self.poll.stop_timeout.as_secs()
            );
            AppError::timeout("stop", self.poll.stop_timeout.as_secs())
        })?;

        instance.pid = None;
        log::info!("Instance {} stopped (was pid {})", instance.name, last_pid);
        Ok(())
    }
}
