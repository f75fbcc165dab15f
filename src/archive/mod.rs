//! Distribution archive extraction.
//!
//! Server distributions ship with a single top-level folder
//! (`apache-tomcat-9.0.50/bin/...`). Extraction strips it so the archive
//! contents land directly in the instance directory.

mod extract;
mod path;
mod tar_gz;
mod zip_ops;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use extract::ExtractStats;

use tar_gz::extract_tar_gz_flat;
use zip_ops::extract_zip_flat;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

/// Extract a distribution archive into `dest_dir`, dropping its top-level folder. Blocking.
pub fn extract_distribution(
    format: ArchiveFormat,
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<ExtractStats> {
    match format {
        ArchiveFormat::Zip => extract_zip_flat(archive_path, dest_dir),
        ArchiveFormat::TarGz => extract_tar_gz_flat(archive_path, dest_dir),
    }
}
