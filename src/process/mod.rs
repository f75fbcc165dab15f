//! Process controller: launcher invocation, PID marker polling and liveness.

mod control;
mod controller;
mod pid_file;

use std::time::Duration;

use crate::config::AppConfig;

pub use control::is_process_alive;
pub use controller::ProcessController;
pub use pid_file::{parse_pid, read_pid};

/// Interval and bounds for start/stop polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl PollSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            start_timeout: config.start_timeout(),
            stop_timeout: config.stop_timeout(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
