use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::paths::AppPaths;

/// Extension of deployable web application archives.
pub const DEPLOYABLE_EXTENSION: &str = "war";

/// A single path component: no separators, no `.`/`..`.
fn is_plain_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && Path::new(value).file_name().map(|n| n == value).unwrap_or(false)
}

fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
}

/// Major versions are plain numbers such as `9` or `10`.
pub fn validate_major_version(major: &str) -> Result<()> {
    if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::parse(format!("Invalid major version: {:?}", major)));
    }
    Ok(())
}

/// Minor versions are archive folder names such as `v9.0.50`.
pub fn validate_version_tag(version: &str) -> Result<()> {
    if !is_safe_segment(version) {
        return Err(AppError::parse(format!("Invalid version: {:?}", version)));
    }
    Ok(())
}

/// Instance names double as directory names under the installation root, so any
/// single path component is accepted.
pub fn validate_instance_name(name: &str) -> Result<()> {
    if !is_plain_segment(name) {
        return Err(AppError::parse(format!("Invalid instance name: {:?}", name)));
    }
    Ok(())
}

/// Deployed application names are plain file names inside the deployment directory.
pub fn validate_app_name(name: &str) -> Result<()> {
    if !is_plain_segment(name) {
        return Err(AppError::parse(format!(
            "Invalid deployed application name: {:?}",
            name
        )));
    }
    Ok(())
}

pub fn is_deployable(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DEPLOYABLE_EXTENSION))
        .unwrap_or(false)
}

/// Resolve an archive cache path, refusing anything outside the zips directory.
pub fn resolve_archive_path(paths: &AppPaths, file_name: &str) -> Result<PathBuf> {
    if !is_safe_segment(file_name) {
        return Err(AppError::io(format!("Invalid archive name: {}", file_name)));
    }

    let zips_dir = paths.zips_dir();
    let zips_dir_canonical = ensure_and_canonicalize_dir(&zips_dir, "zips")?;
    let archive_path = paths.archive_path(file_name);

    if archive_path.exists() {
        let canonical = archive_path
            .canonicalize()
            .map_err(|e| AppError::io(format!("Failed to resolve archive path: {}", e)))?;
        if !canonical.starts_with(&zips_dir_canonical) {
            return Err(AppError::io("Archive path is outside zips directory"));
        }
        return Ok(canonical);
    }

    Ok(archive_path)
}

fn ensure_and_canonicalize_dir(path: &Path, label: &str) -> Result<PathBuf> {
    fs::create_dir_all(path)
        .map_err(|e| AppError::io(format!("Failed to create {} dir: {}", label, e)))?;
    path.canonicalize()
        .map_err(|e| AppError::io(format!("Failed to resolve {} dir: {}", label, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn rejects_traversal_in_names() {
        assert!(validate_instance_name("apache-tomcat-9.0.50").is_ok());
        assert!(validate_instance_name("..").is_err());
        assert!(validate_instance_name("a/b").is_err());
        assert!(validate_version_tag("v10.1.0-M1").is_ok());
        assert!(validate_version_tag("v9/../x").is_err());
        assert!(validate_major_version("9").is_ok());
        assert!(validate_major_version("9a").is_err());
    }

    #[test]
    fn instance_names_are_any_single_component() {
        assert!(validate_instance_name("Tomcat 9 (staging)").is_ok());
        assert!(validate_instance_name("tomcat_ü").is_ok());
        assert!(validate_instance_name("").is_err());
        assert!(validate_instance_name("a\\b").is_err());
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let kinds = [
            validate_instance_name("../escape").unwrap_err().kind(),
            validate_major_version("nine").unwrap_err().kind(),
            validate_version_tag("v9 0").unwrap_err().kind(),
            validate_app_name("a/b.war").unwrap_err().kind(),
        ];
        assert!(kinds.iter().all(|kind| *kind == ErrorKind::Parse));
    }

    #[test]
    fn app_names_are_plain_files() {
        assert!(validate_app_name("shop.war").is_ok());
        assert!(validate_app_name("../shop.war").is_err());
        assert!(validate_app_name("").is_err());
    }

    #[test]
    fn only_war_files_are_deployable() {
        assert!(is_deployable("shop.war"));
        assert!(is_deployable("SHOP.WAR"));
        assert!(!is_deployable("ROOT"));
        assert!(!is_deployable("shop.war.bak"));
    }
}
