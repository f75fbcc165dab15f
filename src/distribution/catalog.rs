//! Version catalog backed by the archive's per-major directory listing.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::download::fetch_text;
use crate::error::{AppError, Result};
use crate::validation::validate_major_version;

/// Label prefix of the duplicated newest entry at the front of a choice list.
pub const LATEST_LABEL_PREFIX: &str = "Latest: ";

/// One selectable minor version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChoice {
    pub label: String,
    pub version: String,
}

/// Minor versions per major version, cached for the lifetime of the catalog.
///
/// An empty list means "not fetched yet".
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    base_url: String,
    listings: HashMap<String, Vec<String>>,
}

impl VersionCatalog {
    pub fn new(base_url: impl Into<String>, majors: &[String]) -> Self {
        Self {
            base_url: base_url.into(),
            listings: majors.iter().map(|m| (m.clone(), Vec::new())).collect(),
        }
    }

    pub fn majors(&self) -> Vec<String> {
        let mut majors: Vec<String> = self.listings.keys().cloned().collect();
        majors.sort_by_key(|m| m.parse::<u32>().unwrap_or(u32::MAX));
        majors
    }

    pub fn listing_url(&self, major: &str) -> String {
        format!("{}{}/", self.base_url, major)
    }

    /// Cached minor versions for a major, newest first. Empty if never fetched.
    pub fn cached(&self, major: &str) -> &[String] {
        self.listings.get(major).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Return the choices for `major`, fetching the listing only on first use.
    pub async fn resolve_minor_versions(
        &mut self,
        client: &Client,
        major: &str,
        timeout: Duration,
    ) -> Result<Vec<VersionChoice>> {
        validate_major_version(major)?;

        if self.cached(major).is_empty() {
            let url = self.listing_url(major);
            log::info!("Fetching version listing for major {} from {}", major, url);
            let body = fetch_text(client, &url, timeout).await?;
            let versions = parse_version_listing(&body)?;
            log::info!("Found {} versions for major {}", versions.len(), major);
            self.listings.insert(major.to_string(), versions);
        }

        Ok(build_choices(self.cached(major)))
    }

    /// Newest minor version for `major`, fetching the listing if needed.
    pub async fn latest(&mut self, client: &Client, major: &str, timeout: Duration) -> Result<String> {
        self.resolve_minor_versions(client, major, timeout)
            .await?
            .into_iter()
            .next()
            .map(|choice| choice.version)
            .ok_or_else(|| AppError::not_found("version", major))
    }
}

/// Download URL of a distribution archive.
pub fn archive_url(base_url: &str, major: &str, minor: &str, file_name: &str) -> String {
    format!("{}{}/{}/bin/{}", base_url, major, minor, file_name)
}

fn compare_newest_first(a: &str, b: &str) -> Ordering {
    let av = semver::Version::parse(a.trim_start_matches('v')).ok();
    let bv = semver::Version::parse(b.trim_start_matches('v')).ok();

    match (av, bv) {
        (Some(va), Some(vb)) => vb.cmp(&va),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

/// Extract version folder names (`v9.0.50/`) from an HTML directory listing,
/// newest first.
pub fn parse_version_listing(html: &str) -> Result<Vec<String>> {
    let mut versions: Vec<String> = Vec::new();

    for chunk in html.split("href=\"").skip(1) {
        let Some(target) = chunk.split('"').next() else {
            continue;
        };
        let Some(folder) = target.strip_suffix('/') else {
            continue;
        };
        if folder.starts_with('v')
            && folder.len() > 1
            && !folder.contains('/')
            && !versions.iter().any(|v| v == folder)
        {
            versions.push(folder.to_string());
        }
    }

    if versions.is_empty() {
        return Err(AppError::parse("version listing contains no version folders"));
    }

    versions.sort_by(|a, b| compare_newest_first(a, b));
    Ok(versions)
}

/// Turn a newest-first list into choices, duplicating the newest as "Latest".
pub fn build_choices(versions: &[String]) -> Vec<VersionChoice> {
    let Some(newest) = versions.first() else {
        return Vec::new();
    };

    std::iter::once(VersionChoice {
        label: format!("{}{}", LATEST_LABEL_PREFIX, newest),
        version: newest.clone(),
    })
    .chain(versions.iter().map(|v| VersionChoice {
        label: v.clone(),
        version: v.clone(),
    }))
    .collect()
}
