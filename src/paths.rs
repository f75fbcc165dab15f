//! Centralized path utilities for the application.
//!
//! Layout under the data directory:
//! - servers/{name}/ - one unpacked distribution per instance
//! - zips/{archive} - downloaded archives, reused across installs
//! - config.toml

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::platform;

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "TOMCAT_LAUNCHER_HOME";

/// Name of the PID marker file written by the server under `logs/`.
pub const PID_FILE_NAME: &str = "tomcat.pid";

/// Name of the redirected console log under `logs/`.
pub const CONSOLE_LOG_NAME: &str = "catalina.log";

/// Data-folder context, constructed once at startup and passed to every component.
#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Resolve the data directory from an explicit override, the environment,
    /// or `~/.tomcat_launcher`.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let home =
            dirs::home_dir().ok_or_else(|| AppError::config("Cannot find home directory"))?;
        Ok(Self::new(home.join(".tomcat_launcher")))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    /// Installation root holding one directory per instance.
    pub fn servers_dir(&self) -> PathBuf {
        self.data_dir.join("servers")
    }

    /// Archive cache directory.
    pub fn zips_dir(&self) -> PathBuf {
        self.data_dir.join("zips")
    }

    /// Ensure all required data directories exist.
    pub fn ensure_data_dirs(&self) -> Result<()> {
        for dir in [self.servers_dir(), self.zips_dir()] {
            fs::create_dir_all(&dir)
                .map_err(|e| AppError::io(format!("Failed to create {:?}: {}", dir, e)))?;
        }
        Ok(())
    }

    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.zips_dir().join(file_name)
    }

    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.servers_dir().join(name)
    }

    pub fn instance_bin_dir(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join("bin")
    }

    pub fn instance_logs_dir(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join("logs")
    }

    pub fn pid_file(&self, name: &str) -> PathBuf {
        self.instance_logs_dir(name).join(PID_FILE_NAME)
    }

    pub fn console_log(&self, name: &str) -> PathBuf {
        self.instance_logs_dir(name).join(CONSOLE_LOG_NAME)
    }

    pub fn server_xml(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join("conf").join("server.xml")
    }

    pub fn context_xml(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join("conf").join("context.xml")
    }

    pub fn setenv_script(&self, name: &str) -> PathBuf {
        self.instance_bin_dir(name)
            .join(platform::script_file(platform::SETENV_SCRIPT))
    }

    /// Deployment directory scanned for web application archives.
    pub fn webapps_dir(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join("webapps")
    }

    pub fn deployed_app(&self, instance: &str, app: &str) -> PathBuf {
        self.webapps_dir(instance).join(app)
    }
}
