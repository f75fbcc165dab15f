use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::commands::{AppState, ToggleOutcome};
use crate::error::{AppError, Result};
use crate::inventory::{AddOutcome, ServerAction, TreeNode};

#[derive(Debug, Parser)]
#[command(
    name = "tomcat-launcher",
    version,
    about = "Install, run and inventory local Apache Tomcat servers"
)]
pub struct Cli {
    /// Data directory (defaults to $TOMCAT_LAUNCHER_HOME or ~/.tomcat_launcher)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Print machine readable JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List published minor versions of a major version
    Versions {
        /// Major version, omit to list the configured majors
        major: Option<String>,
    },
    /// Download and install a distribution
    Install {
        major: String,
        /// Minor version such as v9.0.50, or "latest"
        #[arg(default_value = "latest")]
        minor: String,
    },
    /// Delete an installed server
    Remove { name: String },
    Start { name: String },
    Stop { name: String },
    /// Start a stopped server or stop a running one
    Toggle { name: String },
    /// Show the server inventory
    List,
    /// Expand a tree node (a server name or a child key) and print its children
    Show { key: String },
    /// Link a .war into a server's webapps directory
    Deploy { artifact: PathBuf, server: String },
    /// Delete a deployed application from a server
    Undeploy { server: String, app: String },
    /// Print the file behind a server shortcut
    Path {
        name: String,
        #[arg(value_enum)]
        action: ActionArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Log,
    ServerXml,
    ContextXml,
    Setenv,
}

impl From<ActionArg> for ServerAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Log => Self::ShowLog,
            ActionArg::ServerXml => Self::EditServerConfig,
            ActionArg::ContextXml => Self::EditContextConfig,
            ActionArg::Setenv => Self::EditEnvScript,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_nodes(nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        println!("{}{}  [{}]", "  ".repeat(depth), node.label, node.key);
        print_nodes(node.children(), depth + 1);
    }
}

/// Run one parsed command against `state`.
pub async fn execute(state: &mut AppState, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Versions { major: None } => {
            let majors = state.major_versions();
            if json {
                return print_json(&majors);
            }
            for major in majors {
                println!("{}", major);
            }
        }
        Command::Versions { major: Some(major) } => {
            let choices = state.list_versions(&major).await?;
            if json {
                return print_json(&choices);
            }
            for choice in choices {
                println!("{}", choice.label);
            }
        }
        Command::Install { major, minor } => {
            let dir = state.install_version(&major, &minor).await?;
            if json {
                return print_json(&dir);
            }
            println!("Installed into {}", dir.display());
        }
        Command::Remove { name } => {
            state.remove_version(&name).await?;
            println!("Removed {}", name);
        }
        Command::Start { name } => {
            let pid = state.start_instance(&name).await?;
            if json {
                return print_json(&ToggleOutcome::Started { pid });
            }
            println!("{} started (pid {})", name, pid);
        }
        Command::Stop { name } => {
            state.stop_instance(&name).await?;
            println!("{} stopped", name);
        }
        Command::Toggle { name } => {
            let outcome = state.toggle_instance(&name).await?;
            if json {
                return print_json(&outcome);
            }
            match outcome {
                ToggleOutcome::Started { pid } => println!("{} started (pid {})", name, pid),
                ToggleOutcome::Stopped => println!("{} stopped", name),
            }
        }
        Command::List => {
            state.refresh().await?;
            if json {
                return print_json(&state.snapshot());
            }
            if state.inventory().nodes().is_empty() {
                println!("No servers installed in {}", state.paths().servers_dir().display());
            }
            print_nodes(state.inventory().nodes(), 0);
        }
        Command::Show { key } => {
            let children = state.expand(&key).await?;
            if json {
                return print_json(&children);
            }
            print_nodes(&children, 0);
        }
        Command::Deploy { artifact, server } => {
            let outcome = state.deploy_artifact(&artifact, &server).await?;
            if json {
                return print_json(&outcome);
            }
            match outcome {
                AddOutcome::Added => println!("Deployed {} to {}", artifact.display(), server),
                AddOutcome::Duplicate => println!("{} already lists {}", server, artifact.display()),
            }
        }
        Command::Undeploy { server, app } => {
            state
                .remove_deployed_app(&format!("{}/webapps/{}", server, app))
                .await?;
            println!("Removed {} from {}", app, server);
        }
        Command::Path { name, action } => {
            let target = state.action_target(&name, action.into())?;
            if json {
                return print_json(&target);
            }
            println!("{}", target.display());
        }
    }
    Ok(())
}

/// Error rendering for the process exit path.
pub fn report(err: &AppError, json: bool) {
    if json {
        if let Ok(body) = serde_json::to_string(err) {
            eprintln!("{}", body);
            return;
        }
    }
    eprintln!("error: {}", err);
}
