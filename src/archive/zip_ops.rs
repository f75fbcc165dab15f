use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};

use super::extract::ExtractStats;
use super::path::{destination_for, detect_common_top_dir, parse_entry_rel_path};

/// Extract a zip archive to dest_dir, stripping the top-level directory from the archive.
pub(crate) fn extract_zip_flat(archive_path: &Path, dest_dir: &Path) -> Result<ExtractStats> {
    fs::create_dir_all(dest_dir).map_err(|e| AppError::io(e.to_string()))?;
    let file = fs::File::open(archive_path)
        .map_err(|e| AppError::io(format!("failed to open {archive_path:?}: {e}")))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let top_dir = detect_common_top_dir(archive.file_names());
    let mut stats = ExtractStats::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let raw_name = entry.name().to_string();

        if parse_entry_rel_path(&raw_name).is_none() {
            return Err(AppError::io(format!(
                "archive contains unsafe zip path: {raw_name:?}"
            )));
        }
        if entry.is_symlink() {
            return Err(AppError::io(format!(
                "unsupported symlink entry in distribution archive: {raw_name:?}"
            )));
        }

        let Some(out_path) = destination_for(&raw_name, dest_dir, top_dir.as_deref()) else {
            continue;
        };

        if entry.is_dir() {
            stats.record_dir(&out_path)?;
        } else {
            let mode = entry.unix_mode();
            let size = entry.size();
            stats.record_file(&out_path, &mut entry, mode, size)?;
        }
    }

    Ok(stats)
}
