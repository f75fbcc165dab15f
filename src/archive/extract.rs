use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;

use crate::error::{AppError, Result};

/// Totals for one extracted distribution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
}

impl ExtractStats {
    pub(super) fn record_dir(&mut self, path: &Path) -> Result<()> {
        create_dirs(path)?;
        self.dirs += 1;
        Ok(())
    }

    /// Copy one regular file out of the archive. `declared_size` comes from the
    /// entry header and must match what the stream yields.
    pub(super) fn record_file<R: Read>(
        &mut self,
        path: &Path,
        reader: &mut R,
        mode: Option<u32>,
        declared_size: u64,
    ) -> Result<()> {
        if let Some(parent) = path.parent() {
            create_dirs(parent)?;
        }

        let mut out = fs::File::create(path)
            .map_err(|e| AppError::io(format!("failed to create {path:?}: {e}")))?;
        let copied = io::copy(reader, &mut out)
            .map_err(|e| AppError::io(format!("failed to write {path:?}: {e}")))?;
        if copied != declared_size {
            return Err(AppError::io(format!(
                "truncated entry {path:?}: header says {declared_size} bytes, archive yielded {copied}"
            )));
        }

        restore_mode(path, mode)?;
        self.files += 1;
        self.bytes += copied;
        Ok(())
    }
}

fn create_dirs(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| AppError::io(format!("failed to create directory {path:?}: {e}")))
}

/// Keep permission bits recorded in the archive. File type bits and empty modes
/// (archives built on Windows) are ignored.
#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    match mode.map(|m| m & 0o7777) {
        Some(bits) if bits != 0 => fs::set_permissions(path, fs::Permissions::from_mode(bits))
            .map_err(|e| AppError::io(format!("failed to set permissions on {path:?}: {e}"))),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}
