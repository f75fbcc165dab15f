//! Install and remove server distributions under the installation root.

use std::fs;
use std::path::PathBuf;

use reqwest::Client;

use super::catalog::{archive_url, LATEST_LABEL_PREFIX};
use super::setup::{append_env_overrides, fix_permissions};
use crate::archive::{extract_distribution, ArchiveFormat};
use crate::config::AppConfig;
use crate::download::download_file;
use crate::error::{AppError, Result};
use crate::paths::AppPaths;
use crate::validation::{
    resolve_archive_path, validate_instance_name, validate_major_version, validate_version_tag,
};

const DISTRIBUTION_PREFIX: &str = "apache-tomcat-";

/// Strip the "Latest: " display prefix a choice label may carry.
pub fn normalize_minor(minor: &str) -> &str {
    minor.trim().trim_start_matches(LATEST_LABEL_PREFIX)
}

/// Instance (and directory) name for a minor version, e.g. `v9.0.50` -> `apache-tomcat-9.0.50`.
pub fn instance_name_for(minor: &str) -> String {
    format!(
        "{}{}",
        DISTRIBUTION_PREFIX,
        normalize_minor(minor).trim_start_matches('v')
    )
}

pub fn archive_file_name(minor: &str, format: ArchiveFormat) -> String {
    format!("{}.{}", instance_name_for(minor), format.extension())
}

/// Download (unless cached), extract and prepare a distribution.
///
/// Fails with `AlreadyExists` when the target directory is present; nothing is
/// overwritten. Failures after extraction starts leave the directory as is.
pub async fn install_version(
    client: &Client,
    paths: &AppPaths,
    config: &AppConfig,
    major: &str,
    minor: &str,
) -> Result<PathBuf> {
    let minor = normalize_minor(minor);
    validate_major_version(major)?;
    validate_version_tag(minor)?;

    let name = instance_name_for(minor);
    let install_dir = paths.instance_dir(&name);
    if install_dir.exists() {
        return Err(AppError::already_exists(&name));
    }

    paths.ensure_data_dirs()?;
    let format = config.archive_format;
    let file_name = archive_file_name(minor, format);
    let archive_path = resolve_archive_path(paths, &file_name)?;

    if archive_path.exists() {
        log::info!("Using cached archive {:?}", archive_path);
    } else {
        let folder = format!("v{}", minor.trim_start_matches('v'));
        let url = archive_url(&config.archive_base_url, major, &folder, &file_name);
        log::info!("Downloading {} to {:?}", url, archive_path);
        download_file(client, &url, &archive_path).await?;
    }

    log::info!("Extracting {:?} into {:?}", archive_path, install_dir);
    let dest = install_dir.clone();
    let stats =
        tokio::task::spawn_blocking(move || extract_distribution(format, &archive_path, &dest))
            .await
            .map_err(|e| AppError::other(format!("Extraction task failed: {}", e)))??;
    log::info!(
        "Extracted {} files ({} bytes) and {} directories for {}",
        stats.files,
        stats.bytes,
        stats.dirs,
        name
    );

    fix_permissions(&paths.instance_bin_dir(&name))?;
    append_env_overrides(&paths.setenv_script(&name), config.debug_port)?;

    log::info!("Installed {} at {:?}", name, install_dir);
    Ok(install_dir)
}

/// Recursively delete an instance directory. Does not stop a running server.
pub fn remove_version(paths: &AppPaths, name: &str) -> Result<()> {
    validate_instance_name(name)?;

    let install_dir = paths.instance_dir(name);
    if !install_dir.is_dir() {
        return Err(AppError::not_found("instance", name));
    }

    fs::remove_dir_all(&install_dir)
        .map_err(|e| AppError::io(format!("Failed to remove {:?}: {}", install_dir, e)))?;
    log::info!("Removed {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_distribution_layout() {
        assert_eq!(instance_name_for("v9.0.50"), "apache-tomcat-9.0.50");
        assert_eq!(instance_name_for("Latest: v10.1.0"), "apache-tomcat-10.1.0");
        assert_eq!(
            archive_file_name("v9.0.50", ArchiveFormat::Zip),
            "apache-tomcat-9.0.50.zip"
        );
        assert_eq!(
            archive_file_name("v9.0.50", ArchiveFormat::TarGz),
            "apache-tomcat-9.0.50.tar.gz"
        );
    }

    #[test]
    fn removing_unknown_instance_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        let err = remove_version(&paths, "apache-tomcat-9.0.50").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
