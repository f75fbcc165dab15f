//! Platform-specific process liveness and launcher invocation.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::platform;

/// Check if a process is alive by PID. Lookup failures count as "not running".
#[cfg(target_os = "windows")]
pub fn is_process_alive(pid: u32) -> bool {
    use windows::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    if pid == 0 {
        return false;
    }
    unsafe {
        match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
            Ok(handle) => {
                let mut exit_code: u32 = 0;
                let alive = GetExitCodeProcess(handle, &mut exit_code).is_ok()
                    && (exit_code as i32) == STILL_ACTIVE.0;
                let _ = CloseHandle(handle);
                alive
            }
            Err(_) => false,
        }
    }
}

/// Check if a process is alive by PID. Lookup failures count as "not running".
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // 0 and values past i32::MAX would address process groups.
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }

    kill(Pid::from_raw(raw), None).is_ok() && !is_zombie(pid)
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}

/// An exited but unreaped process still answers signal 0.
#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    stat.rfind(')')
        .and_then(|idx| stat[idx + 1..].split_whitespace().next())
        .map(|state| state == "Z" || state == "X")
        .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Run one of the bundled launcher scripts from `bin_dir` and wait for it to return.
///
/// The launchers background the server themselves; output is discarded so the
/// server cannot keep our pipes open.
pub(super) async fn run_launcher(bin_dir: &Path, stem: &str) -> Result<()> {
    let script = bin_dir.join(platform::script_file(stem));
    if !script.is_file() {
        return Err(AppError::not_found(
            "launcher script",
            &script.display().to_string(),
        ));
    }

    #[cfg(target_os = "windows")]
    let mut cmd = {
        use windows::Win32::System::Threading::CREATE_NO_WINDOW;
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&script).creation_flags(CREATE_NO_WINDOW.0);
        cmd
    };

    #[cfg(not(target_os = "windows"))]
    let mut cmd = Command::new(&script);

    cmd.current_dir(bin_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    log::info!("Running launcher {:?}", script);
    let status = cmd
        .status()
        .await
        .map_err(|e| AppError::io(format!("Failed to run {}: {}", script.display(), e)))?;

    if !status.success() {
        return Err(AppError::other(format!(
            "{} exited with {}",
            script.display(),
            status
        )));
    }
    Ok(())
}
