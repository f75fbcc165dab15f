use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveFormat;
use crate::error::{AppError, Result};
use crate::paths::AppPaths;

const DEFAULT_ARCHIVE_BASE_URL: &str = "https://archive.apache.org/dist/tomcat/tomcat-";

/// Load the config file, writing defaults on first use.
pub fn load_config(paths: &AppPaths) -> Result<AppConfig> {
    let path = paths.config_path();
    if !path.exists() {
        let config = AppConfig::default();
        save_config(paths, &config)?;
        return Ok(config);
    }
    let content = fs::read_to_string(&path).map_err(|e| AppError::config(e.to_string()))?;
    toml::from_str(&content).map_err(|e| AppError::config(e.to_string()))
}

pub fn save_config(paths: &AppPaths, config: &AppConfig) -> Result<()> {
    fs::create_dir_all(paths.data_dir()).map_err(|e| AppError::config(e.to_string()))?;
    let content = toml::to_string_pretty(config).map_err(|e| AppError::config(e.to_string()))?;
    fs::write(paths.config_path(), content).map_err(|e| AppError::config(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix of the per-major archive listing, e.g. `.../tomcat-` + `9` + `/`.
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,
    #[serde(default = "default_major_versions")]
    pub major_versions: Vec<String>,
    #[serde(default)]
    pub archive_format: ArchiveFormat,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_lifecycle_timeout_secs")]
    pub start_timeout_secs: u64,
    #[serde(default = "default_lifecycle_timeout_secs")]
    pub stop_timeout_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// JDWP port written into the environment overrides.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,
}

fn default_archive_base_url() -> String {
    DEFAULT_ARCHIVE_BASE_URL.to_string()
}

fn default_major_versions() -> Vec<String> {
    ["7", "8", "9", "10"].iter().map(|v| v.to_string()).collect()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_lifecycle_timeout_secs() -> u64 {
    60
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_debug_port() -> u16 {
    8081
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            archive_base_url: default_archive_base_url(),
            major_versions: default_major_versions(),
            archive_format: ArchiveFormat::default(),
            poll_interval_ms: default_poll_interval_ms(),
            start_timeout_secs: default_lifecycle_timeout_secs(),
            stop_timeout_secs: default_lifecycle_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            debug_port: default_debug_port(),
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
