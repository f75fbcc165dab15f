//! Inventory tree: installed servers, their shortcuts and deployed applications.

mod tree;
mod types;

pub use tree::{AddOutcome, InventoryEvent, InventoryTree};
pub use types::{
    ActionNode, AppGroupNode, DeployedApp, Instance, NodeItem, NodeKind, ServerAction,
    ServerNode, TreeNode, DEPLOYED_APPS_LABEL, RUNNING_INDICATOR, STOPPED_INDICATOR,
    TOGGLE_SERVER_COMMAND,
};
