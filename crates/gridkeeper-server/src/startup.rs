//! Server startup helper for embedding in the engine binary.
//!
//! Provides [`spawn_server`] which launches the HTTP + `WebSocket` server
//! on a background Tokio task so it runs concurrently with the
//! coordinator task.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the server on a background Tokio task.
///
/// The address is validated before the task is spawned so obvious
/// misconfigurations surface immediately. The returned handle resolves
/// once `shutdown` fires and in-flight connections have drained.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address is invalid.
pub fn spawn_server<F>(
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<JoinHandle<Result<(), ServerError>>, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        let result = crate::server::start_server(&config, state, shutdown).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Server exited with error");
        }
        result
    });

    tracing::info!(%addr, "Server spawned on background task");

    Ok(handle)
}
