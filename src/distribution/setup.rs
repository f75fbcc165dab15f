//! Post-extraction setup: launcher permissions and environment overrides.

use std::fs;
use std::io::{Read as _, Seek as _, SeekFrom, Write as _};
use std::path::Path;

use crate::error::{AppError, Result};
use crate::platform::{self, LAUNCHER_SCRIPTS};

#[cfg(unix)]
fn make_shell_scripts_executable(bin_dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    for entry in walkdir::WalkDir::new(bin_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_script = entry.file_type().is_file()
            && entry.path().extension().map(|ext| ext == "sh").unwrap_or(false);
        if !is_script {
            continue;
        }

        let path = entry.path();
        let mode = fs::metadata(path)
            .map_err(|e| AppError::io(format!("failed to stat {path:?}: {e}")))?
            .permissions()
            .mode();
        fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o755))
            .map_err(|e| AppError::io(format!("failed to set permissions on {path:?}: {e}")))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_shell_scripts_executable(_bin_dir: &Path) -> Result<()> {
    Ok(())
}

/// Make the launcher scripts executable and check the distribution ships them.
pub fn fix_permissions(bin_dir: &Path) -> Result<()> {
    if !bin_dir.is_dir() {
        return Err(AppError::not_found(
            "launcher directory",
            &bin_dir.display().to_string(),
        ));
    }

    make_shell_scripts_executable(bin_dir)?;

    for stem in LAUNCHER_SCRIPTS {
        let script = bin_dir.join(platform::script_file(stem));
        if !script.is_file() {
            return Err(AppError::not_found(
                "launcher script",
                &script.display().to_string(),
            ));
        }
    }
    Ok(())
}

/// Append the PID/log/debug overrides to the environment script, creating it if needed.
///
/// Not idempotent: every call appends another copy.
pub fn append_env_overrides(setenv_path: &Path, debug_port: u16) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(setenv_path)
        .map_err(|e| AppError::io(format!("failed to open {setenv_path:?}: {e}")))?;

    let needs_separator = {
        let len = file
            .seek(SeekFrom::End(0))
            .map_err(|e| AppError::io(e.to_string()))?;
        if len == 0 {
            false
        } else {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))
                .map_err(|e| AppError::io(e.to_string()))?;
            file.read_exact(&mut last)
                .map_err(|e| AppError::io(e.to_string()))?;
            last[0] != b'\n'
        }
    };

    let mut block = String::new();
    if needs_separator {
        block.push('\n');
    }
    for line in platform::env_override_lines(debug_port) {
        block.push_str(&line);
        block.push('\n');
    }

    file.write_all(block.as_bytes())
        .map_err(|e| AppError::io(format!("failed to write {setenv_path:?}: {e}")))?;
    log::info!("Appended environment overrides to {:?}", setenv_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_after_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let setenv = dir.path().join("setenv.sh");
        fs::write(&setenv, "#!/bin/sh\nUMASK=0027").unwrap();

        append_env_overrides(&setenv, 8081).unwrap();

        let content = fs::read_to_string(&setenv).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "UMASK=0027");
        assert!(lines[2].contains("CATALINA_PID"));
        assert!(lines[4].contains("address=8081"));
    }

    #[test]
    fn creates_missing_script_and_repeats_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let setenv = dir.path().join("setenv.sh");

        append_env_overrides(&setenv, 8081).unwrap();
        append_env_overrides(&setenv, 8081).unwrap();

        let content = fs::read_to_string(&setenv).unwrap();
        assert_eq!(content.lines().count(), 6);
        assert_eq!(content.matches("CATALINA_OUT").count(), 2);
    }

    #[test]
    fn missing_launcher_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = fix_permissions(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn shell_scripts_become_executable() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        for stem in LAUNCHER_SCRIPTS {
            let script = dir.path().join(platform::script_file(stem));
            fs::write(&script, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
        }
        fs::write(dir.path().join("bootstrap.jar"), "").unwrap();

        fix_permissions(dir.path()).unwrap();

        let mode = fs::metadata(dir.path().join("startup.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
        let jar_mode = fs::metadata(dir.path().join("bootstrap.jar"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(jar_mode & 0o111, 0);
    }
}
