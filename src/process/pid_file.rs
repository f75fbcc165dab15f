//! PID marker file handling.

use std::fs;
use std::path::Path;

/// Parse marker content. Anything but a positive integer means "no pid".
pub fn parse_pid(content: &str) -> Option<u32> {
    content.trim().parse::<u32>().ok().filter(|pid| *pid > 0)
}

/// Single point-in-time read of a marker file; unreadable or malformed yields `None`.
pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| parse_pid(&content))
}

/// Remove a marker left behind by a server that is no longer alive.
pub(super) fn remove_stale_marker(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => log::info!("Removed stale PID marker {:?}", path),
        Err(e) => log::warn!("Failed to remove stale PID marker {:?}: {}", path, e),
    }
}
