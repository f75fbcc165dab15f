//! Inventory data: instances, deployed applications and tree nodes.

use std::path::PathBuf;

use serde::Serialize;

use crate::process::is_process_alive;

pub const RUNNING_INDICATOR: &str = "🟢";
pub const STOPPED_INDICATOR: &str = "🔴";

/// Command dispatched by the external surface when a server node is activated.
pub const TOGGLE_SERVER_COMMAND: &str = "tomcat-launcher.toggleServer";

/// Group node label under each server.
pub const DEPLOYED_APPS_LABEL: &str = "Deployed applications";

/// One installed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub name: String,
    pub install_path: PathBuf,
    /// Last pid read from the marker file. Only trustworthy once corroborated
    /// against the OS, see [`Instance::is_running`].
    pub pid: Option<u32>,
}

impl Instance {
    /// Recomputed on every call from the OS process table.
    pub fn is_running(&self) -> bool {
        self.pid.map(is_process_alive).unwrap_or(false)
    }
}

/// A web application archive inside an instance's deployment directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedApp {
    pub name: String,
    /// Name of the owning instance; used to build paths only.
    pub instance: String,
}

/// Fixed shortcuts shown under every server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerAction {
    ShowLog,
    EditServerConfig,
    EditContextConfig,
    EditEnvScript,
}

impl ServerAction {
    pub const ALL: [Self; 4] = [
        Self::ShowLog,
        Self::EditServerConfig,
        Self::EditContextConfig,
        Self::EditEnvScript,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ShowLog => "Show catalina log",
            Self::EditServerConfig => "Edit server.xml",
            Self::EditContextConfig => "Edit context.xml",
            Self::EditEnvScript => "Edit setenv",
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::ShowLog => "tomcat-launcher.showCatalinaLog",
            Self::EditServerConfig => "tomcat-launcher.editServerXml",
            Self::EditContextConfig => "tomcat-launcher.editContextXml",
            Self::EditEnvScript => "tomcat-launcher.editSetenv",
        }
    }

    fn key_segment(&self) -> &'static str {
        match self {
            Self::ShowLog => "log",
            Self::EditServerConfig => "server-xml",
            Self::EditContextConfig => "context-xml",
            Self::EditEnvScript => "setenv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    RootInstance,
    ActionItem,
    DeployedAppGroup,
    DeployedApp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerNode {
    pub instance: Instance,
    /// Liveness observed when the node was built.
    pub running: bool,
    /// `None` until the node is first expanded.
    pub children: Option<Vec<TreeNode>>,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionNode {
    pub instance: String,
    pub action: ServerAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppGroupNode {
    pub instance: String,
    pub apps: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeItem {
    Server(ServerNode),
    Action(ActionNode),
    DeployedAppGroup(AppGroupNode),
    DeployedApp(DeployedApp),
}

/// Shared envelope around every node variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub key: String,
    pub item: NodeItem,
}

impl TreeNode {
    pub fn server(instance: Instance, running: bool) -> Self {
        let indicator = if running {
            RUNNING_INDICATOR
        } else {
            STOPPED_INDICATOR
        };
        Self {
            label: format!("{} {}", indicator, instance.name),
            key: instance.name.clone(),
            item: NodeItem::Server(ServerNode {
                instance,
                running,
                children: None,
                expanded: false,
            }),
        }
    }

    pub fn action(instance: &str, action: ServerAction) -> Self {
        Self {
            label: action.label().to_string(),
            key: format!("{}/{}", instance, action.key_segment()),
            item: NodeItem::Action(ActionNode {
                instance: instance.to_string(),
                action,
            }),
        }
    }

    pub fn app_group(instance: &str, app_names: &[String]) -> Self {
        Self {
            label: DEPLOYED_APPS_LABEL.to_string(),
            key: format!("{}/webapps", instance),
            item: NodeItem::DeployedAppGroup(AppGroupNode {
                instance: instance.to_string(),
                apps: app_names
                    .iter()
                    .map(|app| Self::deployed_app(instance, app))
                    .collect(),
            }),
        }
    }

    pub fn deployed_app(instance: &str, app: &str) -> Self {
        Self {
            label: app.to_string(),
            key: format!("{}/webapps/{}", instance, app),
            item: NodeItem::DeployedApp(DeployedApp {
                name: app.to_string(),
                instance: instance.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.item {
            NodeItem::Server(_) => NodeKind::RootInstance,
            NodeItem::Action(_) => NodeKind::ActionItem,
            NodeItem::DeployedAppGroup(_) => NodeKind::DeployedAppGroup,
            NodeItem::DeployedApp(_) => NodeKind::DeployedApp,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.item {
            NodeItem::Server(server) => server.instance.pid,
            _ => None,
        }
    }

    /// Opaque command identifier for the external surface.
    pub fn command(&self) -> Option<&'static str> {
        match &self.item {
            NodeItem::Server(_) => Some(TOGGLE_SERVER_COMMAND),
            NodeItem::Action(action) => Some(action.action.command()),
            NodeItem::DeployedAppGroup(_) | NodeItem::DeployedApp(_) => None,
        }
    }

    /// Children materialized so far; leaves and unexpanded servers have none.
    pub fn children(&self) -> &[TreeNode] {
        match &self.item {
            NodeItem::Server(server) => server.children.as_deref().unwrap_or(&[]),
            NodeItem::DeployedAppGroup(group) => &group.apps,
            NodeItem::Action(_) | NodeItem::DeployedApp(_) => &[],
        }
    }

    pub fn find(&self, key: &str) -> Option<&TreeNode> {
        if self.key == key {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(key))
    }
}
