//! Error types for the gridkeeper-core crate.
//!
//! Action rejections are local to the session that triggered them. They
//! never stop the coordinator or affect other sessions, and each maps onto
//! a wire-level [`FailureReason`] sent only to the caller.

use gridkeeper_types::{FailureReason, SessionId};

/// Reasons an inbound action was rejected before touching any state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// The instance has reached a terminal outcome.
    #[error("game not running")]
    GameNotRunning,

    /// No session is registered under the given id.
    #[error("session not found: {0}")]
    UnknownSession(SessionId),

    /// The action's cooldown is still active.
    #[error("action on cooldown until {until}")]
    OnCooldown {
        /// When the existing cooldown ends.
        until: u64,
    },

    /// The grid holds less energy than the action costs.
    #[error("insufficient grid energy: have {available}, need {required}")]
    InsufficientEnergy {
        /// Current grid level.
        available: f64,
        /// Energy the action would remove.
        required: f64,
    },
}

impl ActionError {
    /// The wire-level reason reported to the caller.
    pub const fn reason(&self) -> FailureReason {
        match self {
            Self::GameNotRunning => FailureReason::GameNotRunning,
            Self::UnknownSession(_) => FailureReason::UnknownSession,
            Self::OnCooldown { .. } => FailureReason::Cooldown,
            Self::InsufficientEnergy { .. } => FailureReason::InsufficientEnergy,
        }
    }
}

/// Errors raised when talking to the coordinator task.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The coordinator task has exited and no longer accepts commands.
    #[error("coordinator task is no longer running")]
    CoordinatorGone,
}
