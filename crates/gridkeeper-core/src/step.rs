//! Borrowed view of the simulation for one run-to-completion step.

use crate::events::EventScheduler;
use crate::session::SessionRegistry;
use crate::state::SharedSimulationState;

/// Everything a tick or an action touches, borrowed for one step.
///
/// Built fresh by the coordinator for each callback so no collaborator
/// holds a long-lived reference to another.
#[derive(Debug)]
pub struct StepContext<'a, G> {
    /// The shared grid.
    pub state: &'a mut SharedSimulationState,
    /// Registered sessions.
    pub sessions: &'a mut SessionRegistry,
    /// Stopped on any terminal transition.
    pub events: &'a mut EventScheduler,
    /// Outbound delivery.
    pub gateway: &'a mut G,
    /// The single clock reading for this step.
    pub now_ms: u64,
}
