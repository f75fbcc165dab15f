//! In-memory inventory of installed servers, rebuilt from disk on refresh.

use std::io;

use serde::Serialize;
use tokio::sync::broadcast;

use super::types::{Instance, NodeItem, ServerAction, ServerNode, TreeNode};
use crate::error::{AppError, Result};
use crate::paths::AppPaths;
use crate::process::{is_process_alive, read_pid};
use crate::validation::{is_deployable, validate_app_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InventoryEvent {
    Refreshed { count: usize },
    Expanded { key: String },
    DeployedAppAdded { instance: String, app: String },
}

/// Result of registering a deployed application in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    /// The server already lists an application with that name; nothing changed.
    Duplicate,
}

/// Server inventory tree.
///
/// Root nodes are replaced wholesale by [`InventoryTree::refresh`]; children are
/// materialized on first expansion and extended in place by
/// [`InventoryTree::add_deployed_app`].
pub struct InventoryTree {
    paths: AppPaths,
    nodes: Vec<TreeNode>,
    events: broadcast::Sender<InventoryEvent>,
}

impl InventoryTree {
    pub fn new(paths: AppPaths) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            paths,
            nodes: Vec::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: InventoryEvent) {
        let _ = self.events.send(event);
    }

    /// Root nodes, one per installed server.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn instances(&self) -> Vec<Instance> {
        self.nodes
            .iter()
            .filter_map(|node| match &node.item {
                NodeItem::Server(server) => Some(server.instance.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn server_names(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.key.clone()).collect()
    }

    fn server(&self, name: &str) -> Option<&ServerNode> {
        self.nodes.iter().find_map(|node| match &node.item {
            NodeItem::Server(server) if server.instance.name == name => Some(server),
            _ => None,
        })
    }

    fn server_mut(&mut self, name: &str) -> Option<&mut ServerNode> {
        self.nodes.iter_mut().find_map(|node| match &mut node.item {
            NodeItem::Server(server) if server.instance.name == name => Some(server),
            _ => None,
        })
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.server(name).map(|server| &server.instance)
    }

    pub fn instance_mut(&mut self, name: &str) -> Option<&mut Instance> {
        self.server_mut(name).map(|server| &mut server.instance)
    }

    pub fn find(&self, key: &str) -> Option<&TreeNode> {
        self.nodes.iter().find_map(|node| node.find(key))
    }

    /// Rebuild every root node from the installation root and the process table.
    pub async fn refresh(&mut self) -> Result<Vec<Instance>> {
        let root = self.paths.servers_dir();
        let mut dir = tokio::fs::read_dir(&root).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AppError::not_found("installation root", &root.display().to_string())
            } else {
                AppError::io(format!("Failed to read {:?}: {}", root, e))
            }
        })?;

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => log::warn!("Skipping non UTF-8 server directory {:?}", raw),
            }
        }
        names.sort();

        let mut instances = Vec::with_capacity(names.len());
        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            let pid = read_pid(&self.paths.pid_file(&name));
            let running = pid.map(is_process_alive).unwrap_or(false);
            let instance = Instance {
                install_path: self.paths.instance_dir(&name),
                name,
                pid,
            };
            instances.push(instance.clone());
            nodes.push(TreeNode::server(instance, running));
        }

        log::info!("Inventory refreshed: {} servers", nodes.len());
        self.nodes = nodes;
        self.emit(InventoryEvent::Refreshed {
            count: instances.len(),
        });
        Ok(instances)
    }

    /// Children of the node with `key`.
    ///
    /// Servers build their action items and deployed application group on first
    /// expansion and keep them until the next refresh. The group returns its
    /// applications; leaf nodes have no children.
    pub async fn expand(&mut self, key: &str) -> Result<Vec<TreeNode>> {
        let is_root = self.nodes.iter().any(|node| node.key == key);
        if !is_root {
            let node = self
                .find(key)
                .ok_or_else(|| AppError::not_found("node", key))?;
            return Ok(node.children().to_vec());
        }

        self.materialize(key).await?;
        let server = self
            .server_mut(key)
            .ok_or_else(|| AppError::not_found("instance", key))?;
        server.expanded = true;
        let children = server.children.clone().unwrap_or_default();

        self.emit(InventoryEvent::Expanded {
            key: key.to_string(),
        });
        Ok(children)
    }

    async fn materialize(&mut self, name: &str) -> Result<()> {
        let already = self
            .server(name)
            .ok_or_else(|| AppError::not_found("instance", name))?
            .children
            .is_some();
        if already {
            return Ok(());
        }

        let apps = scan_deployed_apps(&self.paths, name).await?;
        let mut children: Vec<TreeNode> = ServerAction::ALL
            .iter()
            .map(|action| TreeNode::action(name, *action))
            .collect();
        children.push(TreeNode::app_group(name, &apps));

        if let Some(server) = self.server_mut(name) {
            server.children = Some(children);
        }
        Ok(())
    }

    /// Register an application already linked into the server's deployment directory.
    ///
    /// Does not touch disk beyond materializing the server's children.
    pub async fn add_deployed_app(&mut self, app: &str, instance: &str) -> Result<AddOutcome> {
        validate_app_name(app)?;
        if !is_deployable(app) {
            return Err(AppError::parse(format!(
                "{} is not a web application archive",
                app
            )));
        }

        let was_materialized = self
            .server(instance)
            .ok_or_else(|| AppError::not_found("instance", instance))?
            .children
            .is_some();
        self.materialize(instance).await?;

        let server = self
            .server_mut(instance)
            .ok_or_else(|| AppError::not_found("instance", instance))?;
        server.expanded = true;

        let group = server
            .children
            .iter_mut()
            .flatten()
            .find_map(|child| match &mut child.item {
                NodeItem::DeployedAppGroup(group) => Some(group),
                _ => None,
            })
            .ok_or_else(|| AppError::not_found("deployed application group", instance))?;

        let listed = group.apps.iter().any(|node| node.label == app);
        if listed && was_materialized {
            log::info!("{} is already deployed on {}", app, instance);
            return Ok(AddOutcome::Duplicate);
        }
        if !listed {
            group.apps.push(TreeNode::deployed_app(instance, app));
        }

        self.emit(InventoryEvent::DeployedAppAdded {
            instance: instance.to_string(),
            app: app.to_string(),
        });
        Ok(AddOutcome::Added)
    }

    /// Delete the application's artifact from disk, then rebuild the tree.
    pub async fn remove_deployed_app(&mut self, key: &str) -> Result<Vec<Instance>> {
        let node = self
            .find(key)
            .ok_or_else(|| AppError::not_found("node", key))?;
        let NodeItem::DeployedApp(app) = &node.item else {
            return Err(AppError::other(format!(
                "{} is not a deployed application",
                key
            )));
        };

        let artifact = self.paths.deployed_app(&app.instance, &app.name);
        let metadata = tokio::fs::symlink_metadata(&artifact).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AppError::not_found("deployed application", &artifact.display().to_string())
            } else {
                AppError::io(format!("Failed to inspect {:?}: {}", artifact, e))
            }
        })?;

        let removal = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&artifact).await
        } else {
            tokio::fs::remove_file(&artifact).await
        };
        removal.map_err(|e| AppError::io(format!("Failed to remove {:?}: {}", artifact, e)))?;
        log::info!("Removed deployed application {:?}", artifact);

        self.refresh().await
    }
}

/// Deployable archives in an instance's deployment directory, sorted by name.
async fn scan_deployed_apps(paths: &AppPaths, instance: &str) -> Result<Vec<String>> {
    let webapps = paths.webapps_dir(instance);
    let mut dir = match tokio::fs::read_dir(&webapps).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AppError::io(format!("Failed to read {:?}: {}", webapps, e)));
        }
    };

    let mut apps = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_deployable(name) {
                apps.push(name.to_string());
            }
        }
    }
    apps.sort();
    Ok(apps)
}
