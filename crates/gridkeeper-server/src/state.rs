//! Shared application state for the Axum server.

use gridkeeper_core::runtime::CoordinatorHandle;
use gridkeeper_types::StateSnapshot;
use tokio::sync::watch;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Command channel into the coordinator task.
    pub handle: CoordinatorHandle,
    /// Latest snapshot published by the coordinator task.
    pub snapshots: watch::Receiver<StateSnapshot>,
}

impl AppState {
    /// Bundle a coordinator handle with its snapshot feed.
    pub const fn new(handle: CoordinatorHandle, snapshots: watch::Receiver<StateSnapshot>) -> Self {
        Self { handle, snapshots }
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Whether the coordinator task is still publishing.
    pub fn coordinator_alive(&self) -> bool {
        self.snapshots.has_changed().is_ok()
    }
}
