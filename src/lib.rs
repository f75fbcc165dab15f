pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod distribution;
pub mod download;
pub mod error;
pub mod inventory;
pub mod paths;
pub mod platform;
pub mod process;
pub mod validation;

use std::process::ExitCode;

use clap::Parser as _;
use tokio::sync::broadcast::error::RecvError;

use cli::Cli;
use commands::AppState;
use config::load_config;
pub use error::{AppError, ErrorKind, Result};
use paths::AppPaths;

fn build_state(cli: &Cli) -> Result<AppState> {
    let paths = AppPaths::resolve(cli.data_dir.clone())?;
    paths.ensure_data_dirs()?;
    let config = load_config(&paths)?;
    AppState::new(paths, config)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut state = build_state(&cli)?;

    let mut rx = state.inventory().subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log::debug!("Inventory event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Inventory event listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = cli::execute(&mut state, cli.command, cli.json).await;
    drop(state);
    let _ = listener.await;
    result
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let json = cli.json;

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            cli::report(&AppError::other(format!("Failed to start runtime: {}", e)), json);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("Command failed: {:?}", e);
            cli::report(&e, json);
            ExitCode::FAILURE
        }
    }
}
