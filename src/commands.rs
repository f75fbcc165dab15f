//! Command surface consumed by the CLI (or any other shell).
//!
//! Every mutating command takes `&mut self`, so one `AppState` is a single actor:
//! start/stop/install/remove for an instance can never interleave.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Serialize;

use crate::config::AppConfig;
use crate::distribution::{self, VersionCatalog, VersionChoice};
use crate::error::{AppError, Result};
use crate::inventory::{AddOutcome, Instance, InventoryTree, NodeItem, ServerAction, TreeNode};
use crate::paths::AppPaths;
use crate::process::{PollSettings, ProcessController};
use crate::validation::{is_deployable, validate_app_name, validate_instance_name};

/// Minor version keyword resolving to the newest published release.
pub const LATEST_KEYWORD: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Started { pid: u32 },
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    pub data_dir: PathBuf,
    pub instances: Vec<InstanceStatus>,
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    pub name: String,
    pub install_path: PathBuf,
    pub pid: Option<u32>,
    pub running: bool,
}

impl From<&Instance> for InstanceStatus {
    fn from(instance: &Instance) -> Self {
        Self {
            name: instance.name.clone(),
            install_path: instance.install_path.clone(),
            pid: instance.pid,
            running: instance.is_running(),
        }
    }
}

pub struct AppState {
    paths: AppPaths,
    config: AppConfig,
    client: Client,
    catalog: VersionCatalog,
    inventory: InventoryTree,
    controller: ProcessController,
}

impl AppState {
    pub fn new(paths: AppPaths, config: AppConfig) -> Result<Self> {
        paths.ensure_data_dirs()?;
        let client = Client::builder()
            .connect_timeout(config.http_timeout())
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;
        let catalog = VersionCatalog::new(config.archive_base_url.clone(), &config.major_versions);
        let inventory = InventoryTree::new(paths.clone());
        let controller = ProcessController::new(paths.clone(), PollSettings::from_config(&config));

        Ok(Self {
            paths,
            config,
            client,
            catalog,
            inventory,
            controller,
        })
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn inventory(&self) -> &InventoryTree {
        &self.inventory
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            data_dir: self.paths.data_dir().to_path_buf(),
            instances: self
                .inventory
                .instances()
                .iter()
                .map(InstanceStatus::from)
                .collect(),
            nodes: self.inventory.nodes().to_vec(),
        }
    }

    async fn ensure_listed(&mut self, name: &str) -> Result<()> {
        validate_instance_name(name)?;
        if self.inventory.instance(name).is_none() {
            self.inventory.refresh().await?;
        }
        if self.inventory.instance(name).is_none() {
            return Err(AppError::not_found("instance", name));
        }
        Ok(())
    }

    /// Rebuild the tree after a lifecycle command without masking its outcome.
    async fn refresh_after(&mut self, name: &str) {
        if let Err(e) = self.inventory.refresh().await {
            log::warn!("Failed to refresh inventory after acting on {}: {}", name, e);
        }
    }

    /// Materialize the server a child key belongs to, so keys work in a fresh session.
    async fn materialize_owner(&mut self, key: &str) -> Result<()> {
        if self.inventory.find(key).is_some() {
            return Ok(());
        }
        if let Some((instance, _)) = key.split_once('/') {
            self.ensure_listed(instance).await?;
            self.inventory.expand(instance).await?;
        }
        Ok(())
    }

    // === Versions ===

    pub fn major_versions(&self) -> Vec<String> {
        self.catalog.majors()
    }

    pub async fn list_versions(&mut self, major: &str) -> Result<Vec<VersionChoice>> {
        self.catalog
            .resolve_minor_versions(&self.client, major, self.config.http_timeout())
            .await
    }

    /// Install `major`/`minor` (`latest` picks the newest) and refresh the inventory.
    pub async fn install_version(&mut self, major: &str, minor: &str) -> Result<PathBuf> {
        let minor = if minor.trim().eq_ignore_ascii_case(LATEST_KEYWORD) {
            self.catalog
                .latest(&self.client, major, self.config.http_timeout())
                .await?
        } else {
            distribution::normalize_minor(minor).to_string()
        };

        let install_dir =
            distribution::install_version(&self.client, &self.paths, &self.config, major, &minor)
                .await?;
        self.inventory.refresh().await?;
        Ok(install_dir)
    }

    /// Remove an installed server. Refuses while the server is running.
    pub async fn remove_version(&mut self, name: &str) -> Result<Vec<Instance>> {
        validate_instance_name(name)?;
        self.inventory.refresh().await?;
        let running = self
            .inventory
            .instance(name)
            .map(Instance::is_running)
            .unwrap_or(false);
        if running {
            return Err(AppError::instance_running(name));
        }

        distribution::remove_version(&self.paths, name)?;
        self.inventory.refresh().await
    }

    // === Lifecycle ===

    pub async fn start_instance(&mut self, name: &str) -> Result<u32> {
        self.ensure_listed(name).await?;
        let instance = self
            .inventory
            .instance_mut(name)
            .ok_or_else(|| AppError::not_found("instance", name))?;
        let result = self.controller.start(instance).await;
        self.refresh_after(name).await;
        result
    }

    pub async fn stop_instance(&mut self, name: &str) -> Result<()> {
        self.ensure_listed(name).await?;
        let instance = self
            .inventory
            .instance_mut(name)
            .ok_or_else(|| AppError::not_found("instance", name))?;
        let result = self.controller.stop(instance).await;
        self.refresh_after(name).await;
        result
    }

    /// Start a stopped server or stop a running one.
    pub async fn toggle_instance(&mut self, name: &str) -> Result<ToggleOutcome> {
        validate_instance_name(name)?;
        self.inventory.refresh().await?;
        self.ensure_listed(name).await?;
        let running = self
            .inventory
            .instance(name)
            .map(Instance::is_running)
            .unwrap_or(false);
        if running {
            self.stop_instance(name).await?;
            Ok(ToggleOutcome::Stopped)
        } else {
            let pid = self.start_instance(name).await?;
            Ok(ToggleOutcome::Started { pid })
        }
    }

    // === Inventory ===

    pub async fn refresh(&mut self) -> Result<Vec<Instance>> {
        self.inventory.refresh().await
    }

    pub async fn expand(&mut self, key: &str) -> Result<Vec<TreeNode>> {
        if self.inventory.nodes().is_empty() {
            self.inventory.refresh().await?;
        }
        self.materialize_owner(key).await?;
        self.inventory.expand(key).await
    }

    pub async fn add_deployed_app(&mut self, app: &str, instance: &str) -> Result<AddOutcome> {
        self.ensure_listed(instance).await?;
        self.inventory.add_deployed_app(app, instance).await
    }

    /// Link a `.war` into the server's deployment directory and list it.
    ///
    /// An artifact already present on disk is a duplicate even in a fresh session.
    pub async fn deploy_artifact(&mut self, artifact: &Path, instance: &str) -> Result<AddOutcome> {
        self.ensure_listed(instance).await?;
        let linked = link_artifact(&self.paths, artifact, instance)?;
        let outcome = self.inventory.add_deployed_app(&linked.app, instance).await?;
        if linked.already_present {
            return Ok(AddOutcome::Duplicate);
        }
        Ok(outcome)
    }

    pub async fn remove_deployed_app(&mut self, key: &str) -> Result<Vec<Instance>> {
        self.materialize_owner(key).await?;
        self.inventory.remove_deployed_app(key).await
    }

    // === Shortcuts ===

    /// File an action item opens.
    pub fn action_target(&self, instance: &str, action: ServerAction) -> Result<PathBuf> {
        validate_instance_name(instance)?;
        Ok(match action {
            ServerAction::ShowLog => self.paths.console_log(instance),
            ServerAction::EditServerConfig => self.paths.server_xml(instance),
            ServerAction::EditContextConfig => self.paths.context_xml(instance),
            ServerAction::EditEnvScript => self.paths.setenv_script(instance),
        })
    }

    /// File behind an action item or deployed application node.
    pub fn node_target(&self, key: &str) -> Result<PathBuf> {
        let node = self
            .inventory
            .find(key)
            .ok_or_else(|| AppError::not_found("node", key))?;
        match &node.item {
            NodeItem::Action(action) => self.action_target(&action.instance, action.action),
            NodeItem::DeployedApp(app) => Ok(self.paths.deployed_app(&app.instance, &app.name)),
            NodeItem::Server(server) => Ok(server.instance.install_path.clone()),
            NodeItem::DeployedAppGroup(group) => Ok(self.paths.webapps_dir(&group.instance)),
        }
    }
}

#[cfg(unix)]
fn place_artifact(source: &Path, dest: &Path) -> Result<()> {
    std::os::unix::fs::symlink(source, dest)
        .map_err(|e| AppError::io(format!("failed to link {source:?} to {dest:?}: {e}")))
}

#[cfg(not(unix))]
fn place_artifact(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest)
        .map(|_| ())
        .map_err(|e| AppError::io(format!("failed to copy {source:?} to {dest:?}: {e}")))
}

struct LinkedArtifact {
    app: String,
    already_present: bool,
}

/// Symlink (or copy, where symlinks are unavailable) an artifact into `webapps/`.
fn link_artifact(paths: &AppPaths, artifact: &Path, instance: &str) -> Result<LinkedArtifact> {
    let source = artifact.canonicalize().map_err(|_| {
        AppError::not_found("artifact", &artifact.display().to_string())
    })?;
    let app = source
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::other(format!("Invalid artifact path {:?}", source)))?;
    validate_app_name(&app)?;
    if !source.is_file() || !is_deployable(&app) {
        return Err(AppError::parse(format!(
            "{} is not a web application archive",
            source.display()
        )));
    }

    let webapps = paths.webapps_dir(instance);
    fs::create_dir_all(&webapps)
        .map_err(|e| AppError::io(format!("Failed to create {:?}: {}", webapps, e)))?;

    let dest = webapps.join(&app);
    let already_present = fs::symlink_metadata(&dest).is_ok();
    if already_present {
        log::info!("{:?} already present, leaving it in place", dest);
    } else {
        place_artifact(&source, &dest)?;
        log::info!("Linked {:?} into {:?}", source, webapps);
    }
    Ok(LinkedArtifact {
        app,
        already_present,
    })
}
