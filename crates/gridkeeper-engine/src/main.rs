//! Gridkeeper engine binary.
//!
//! Wires together configuration, logging, the coordinator task and the
//! HTTP + `WebSocket` server, then runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `GRIDKEEPER_CONFIG` or `gridkeeper-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the session coordinator
//! 4. Spawn the coordinator task
//! 5. Spawn the server
//! 6. Wait for the server to drain, then for the coordinator to stop

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gridkeeper_core::clock::SystemClock;
use gridkeeper_core::config::{GameConfig, LogFormat, LoggingConfig};
use gridkeeper_core::coordinator::SessionCoordinator;
use gridkeeper_core::gateway::ChannelGateway;
use gridkeeper_core::runtime::{self, command_channel};
use gridkeeper_server::server::ServerConfig;
use gridkeeper_server::startup::spawn_server;
use gridkeeper_server::state::AppState;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "gridkeeper-config.yaml";

/// How long the coordinator gets to stop once the server has drained.
const COORDINATOR_STOP_GRACE: Duration = Duration::from_secs(2);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the server cannot start,
/// or a background task fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("gridkeeper-engine starting");
    info!(
        source = %source,
        tick_interval_ms = config.grid.tick_interval_ms,
        event_check_interval_ms = config.events.check_interval_ms,
        coop_win_seconds = config.zones.coop_win_duration_seconds,
        stash_win_target = config.steal.stash_win_target,
        "Configuration loaded"
    );

    // 3. Build the coordinator.
    let server_config = ServerConfig::from(&config.server);
    let coordinator = SessionCoordinator::new(config, ChannelGateway::new(), SystemClock)
        .map_err(EngineError::from)?;

    // 4. Spawn the coordinator task.
    let (snapshot_tx, snapshot_rx) = watch::channel(coordinator.snapshot());
    let (handle, commands) = command_channel();
    let mut coordinator_task = tokio::spawn(runtime::run(coordinator, commands, snapshot_tx));

    // 5. Spawn the server.
    let app_state = Arc::new(AppState::new(handle, snapshot_rx));
    let server_task =
        spawn_server(server_config, app_state, shutdown_signal()).map_err(EngineError::from)?;

    // 6. Drain.
    server_task
        .await
        .map_err(EngineError::from)?
        .map_err(EngineError::from)?;
    info!("Server stopped");

    match tokio::time::timeout(COORDINATOR_STOP_GRACE, &mut coordinator_task).await {
        Ok(joined) => {
            let coordinator = joined.map_err(EngineError::from)?;
            info!(
                sessions = coordinator.sessions().len(),
                outcome = ?coordinator.state().final_outcome(),
                "Coordinator stopped"
            );
        }
        Err(_elapsed) => {
            warn!("Sessions still open after shutdown, aborting coordinator");
            coordinator_task.abort();
        }
    }

    info!("gridkeeper-engine shutdown complete");
    Ok(())
}

/// Load configuration, returning it with a description of where it came from.
///
/// An explicit `GRIDKEEPER_CONFIG` path must exist. The default path falls
/// back to built-in defaults when missing.
fn load_config() -> Result<(GameConfig, String), EngineError> {
    if let Ok(explicit) = std::env::var("GRIDKEEPER_CONFIG") {
        let path = PathBuf::from(explicit);
        let config = GameConfig::from_file(&path)?;
        return Ok((config, path.display().to_string()));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = GameConfig::from_file(&path)?;
        Ok((config, DEFAULT_CONFIG_PATH.to_owned()))
    } else {
        let mut config = GameConfig::default();
        config.server.apply_env_overrides();
        Ok((config, "defaults".to_owned()))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    match logging.format {
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Resolve on Ctrl-C.
///
/// If the handler cannot be installed the future never resolves, so the
/// process keeps serving until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
