//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and shutdown so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gridkeeper_core::config::ConfigError,
    },

    /// The server could not be spawned.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: gridkeeper_server::startup::StartupError,
    },

    /// The server exited with an error.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: gridkeeper_server::server::ServerError,
    },

    /// A background task panicked or was cancelled.
    #[error("task join error: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
