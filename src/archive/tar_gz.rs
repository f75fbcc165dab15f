use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};

use super::extract::ExtractStats;
use super::path::{destination_for, detect_common_top_dir, parse_entry_rel_path};

fn open_archive(archive_path: &Path) -> Result<tar::Archive<flate2::read::GzDecoder<fs::File>>> {
    let file = fs::File::open(archive_path)
        .map_err(|e| AppError::io(format!("failed to open {archive_path:?}: {e}")))?;
    Ok(tar::Archive::new(flate2::read::GzDecoder::new(file)))
}

fn entry_path_string<R: std::io::Read>(entry: &tar::Entry<'_, R>) -> Result<String> {
    let path = entry.path().map_err(|e| AppError::io(e.to_string()))?;
    path.to_str().map(str::to_string).ok_or_else(|| {
        AppError::io(format!("archive entry path is not valid UTF-8: {:?}", path))
    })
}

/// Extract tar.gz archive to dest_dir, stripping the top-level directory from the archive.
pub(crate) fn extract_tar_gz_flat(archive_path: &Path, dest_dir: &Path) -> Result<ExtractStats> {
    // First pass: collect entry names to find the common top-level directory.
    let mut names = Vec::new();
    let mut archive = open_archive(archive_path)?;
    for entry in archive.entries().map_err(|e| AppError::io(e.to_string()))? {
        let entry = entry.map_err(|e| AppError::io(e.to_string()))?;
        names.push(entry_path_string(&entry)?);
    }
    let top_dir = detect_common_top_dir(names.iter().map(String::as_str));

    fs::create_dir_all(dest_dir).map_err(|e| AppError::io(e.to_string()))?;
    let mut stats = ExtractStats::default();
    let mut archive = open_archive(archive_path)?;
    for entry in archive.entries().map_err(|e| AppError::io(e.to_string()))? {
        let mut entry = entry.map_err(|e| AppError::io(e.to_string()))?;
        let raw_path = entry_path_string(&entry)?;

        if parse_entry_rel_path(&raw_path).is_none() {
            return Err(AppError::io(format!(
                "archive contains unsafe entry path: {raw_path:?}"
            )));
        }

        let entry_type = entry.header().entry_type();
        if !entry_type.is_dir() && !entry_type.is_file() {
            return Err(AppError::io(format!(
                "unsupported tar entry type at {raw_path:?}: {entry_type:?}"
            )));
        }

        let Some(out_path) = destination_for(&raw_path, dest_dir, top_dir.as_deref()) else {
            continue;
        };

        if entry_type.is_dir() {
            stats.record_dir(&out_path)?;
        } else {
            let mode = entry.header().mode().ok();
            let size = entry
                .header()
                .size()
                .map_err(|e| AppError::io(e.to_string()))?;
            stats.record_file(&out_path, &mut entry, mode, size)?;
        }
    }

    Ok(stats)
}
