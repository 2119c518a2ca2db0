//! Enumeration types for the Gridkeeper simulation.
//!
//! Every action, event, outcome, and failure is a closed set. Adding a
//! variant is a compile-time-checked change for every `match` that
//! dispatches on it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// One of the four actions a session can perform against the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Add a small amount of energy. No cooldown.
    Generate,
    /// Slow decay for everyone for a short window.
    Stabilize,
    /// Move energy from the grid into the caller's private stash.
    StealGrid,
    /// Zone-dependent corrective shove (boost, coolant, or misuse penalty).
    EmergencyAdjust,
}

impl ActionKind {
    /// The cooldown slot this action occupies, if it is cooldown-gated.
    pub const fn cooldown(self) -> Option<CooldownAction> {
        match self {
            Self::Generate => None,
            Self::Stabilize => Some(CooldownAction::Stabilize),
            Self::StealGrid => Some(CooldownAction::StealGrid),
            Self::EmergencyAdjust => Some(CooldownAction::EmergencyAdjust),
        }
    }
}

/// The cooldown-gated subset of [`ActionKind`].
///
/// Each session carries one cooldown timestamp per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum CooldownAction {
    /// Cooldown for [`ActionKind::Stabilize`].
    Stabilize,
    /// Cooldown for [`ActionKind::StealGrid`].
    StealGrid,
    /// Cooldown for [`ActionKind::EmergencyAdjust`].
    EmergencyAdjust,
}

impl CooldownAction {
    /// All gated actions in wire order.
    pub const ALL: [Self; 3] = [Self::Stabilize, Self::StealGrid, Self::EmergencyAdjust];
}

impl From<CooldownAction> for ActionKind {
    fn from(action: CooldownAction) -> Self {
        match action {
            CooldownAction::Stabilize => Self::Stabilize,
            CooldownAction::StealGrid => Self::StealGrid,
            CooldownAction::EmergencyAdjust => Self::EmergencyAdjust,
        }
    }
}

// ---------------------------------------------------------------------------
// Environmental events
// ---------------------------------------------------------------------------

/// A stochastically triggered, time-limited rate modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// Decay runs faster.
    Surge,
    /// Generate yields more energy per click.
    Efficiency,
}

// ---------------------------------------------------------------------------
// Terminal outcomes
// ---------------------------------------------------------------------------

/// Why a session instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum OutcomeReason {
    /// Enough cumulative time was spent in the safe band.
    CoopWin,
    /// The grid stayed in the low danger band too long.
    Shutdown,
    /// The grid stayed in the high danger band too long.
    Meltdown,
    /// One session filled its stash to the target.
    IndividualWin,
}

// ---------------------------------------------------------------------------
// Action failures
// ---------------------------------------------------------------------------

/// Reason an action was rejected, as shown to the acting session.
///
/// The serialized strings are user-facing and match what existing
/// controller clients display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FailureReason {
    /// The action's cooldown has not elapsed.
    #[serde(rename = "cooldown")]
    Cooldown,
    /// The grid holds less energy than the action costs.
    #[serde(rename = "Insufficient grid energy")]
    InsufficientEnergy,
    /// The session instance has already reached a terminal outcome.
    #[serde(rename = "Game not running")]
    GameNotRunning,
    /// The acting session is not registered.
    #[serde(rename = "Player not found")]
    UnknownSession,
    /// Emergency adjust was used outside both danger bands.
    #[serde(rename = "Used in wrong zone!")]
    WrongZone,
}
