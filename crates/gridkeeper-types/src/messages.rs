//! Wire messages exchanged between sessions and the coordinator.
//!
//! Every frame is a JSON object whose `event` field names the message.
//! Outbound frames carry their payload under `data`:
//!
//! ```json
//! { "event": "actionCooldown", "data": { "action": "stealGrid", "cooldownEndTimestamp": 1700000000000 } }
//! ```
//!
//! Inbound frames carry no payload: `{ "event": "stealGrid" }`.
//!
//! All timestamps are wall-clock milliseconds since the Unix epoch, with
//! `0` meaning "inactive".

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionKind, CooldownAction, EventKind, FailureReason, OutcomeReason};
use crate::ids::SessionId;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A message sent by a session to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ClientMessage {
    /// Perform [`ActionKind::Generate`].
    Generate,
    /// Perform [`ActionKind::Stabilize`].
    Stabilize,
    /// Perform [`ActionKind::StealGrid`].
    StealGrid,
    /// Perform [`ActionKind::EmergencyAdjust`].
    EmergencyAdjust,
    /// Ask for a fresh session instance after a terminal outcome.
    RequestReset,
}

impl ClientMessage {
    /// The player action this message requests, or `None` for control
    /// messages.
    pub const fn action(self) -> Option<ActionKind> {
        match self {
            Self::Generate => Some(ActionKind::Generate),
            Self::Stabilize => Some(ActionKind::Stabilize),
            Self::StealGrid => Some(ActionKind::StealGrid),
            Self::EmergencyAdjust => Some(ActionKind::EmergencyAdjust),
            Self::RequestReset => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Full, freshly computed view of the shared grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StateSnapshot {
    /// Current grid energy.
    pub energy_level: f64,
    /// Number of registered sessions.
    pub player_count: u32,
    /// Cumulative safe-band seconds required for a cooperative win.
    #[ts(type = "number")]
    pub coop_win_target_seconds: u64,
    /// Whole seconds accumulated in the safe band so far.
    #[ts(type = "number")]
    pub coop_win_progress_seconds: u64,
    /// Whether the session instance is still running.
    pub game_is_running: bool,
    /// Terminal reason, once decided.
    pub final_outcome_reason: Option<OutcomeReason>,
    /// Winning session for an individual win.
    pub final_outcome_winner: Option<SessionId>,
    /// Currently active environmental event.
    pub active_event_type: Option<EventKind>,
    /// End of the active event, or `0`.
    #[ts(type = "number")]
    pub active_event_end_time: u64,
    /// Stash needed for an individual win.
    pub stash_win_target: u32,
    /// The receiving session's stash. Only present in the bootstrap
    /// snapshot sent on connect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub personal_stash: Option<u32>,
}

/// Cooldown acknowledgement for one gated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CooldownUpdate {
    /// The gated action.
    pub action: CooldownAction,
    /// When the cooldown ends, or `0` when cleared.
    #[ts(type = "number")]
    pub cooldown_end_timestamp: u64,
}

/// The receiving session's private stash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StashUpdate {
    /// Current stash value.
    pub personal_stash: u32,
}

/// Rejection (or misuse warning) for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ActionFailure {
    /// The action that failed.
    pub action: CooldownAction,
    /// Why it failed.
    pub reason: FailureReason,
}

/// Environmental event activation or expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventUpdate {
    /// The active event, or `None` once it has ended.
    #[serde(rename = "type")]
    pub event_type: Option<EventKind>,
    /// End of the event, or `0`.
    #[ts(type = "number")]
    pub end_time: u64,
}

/// Stabilize effect activation or expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StabilizeUpdate {
    /// Whether the effect is now active.
    pub active: bool,
    /// End of the effect, or `0`.
    #[ts(type = "number")]
    pub end_timestamp: u64,
}

/// Terminal outcome of a session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GameOver {
    /// Why the instance ended.
    pub reason: OutcomeReason,
    /// Winning session for an individual win.
    pub winner_id: Option<SessionId>,
}

/// A message sent by the coordinator to one or all sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Full state snapshot (broadcast, or targeted on connect).
    GameStateUpdate(StateSnapshot),
    /// Cooldown acknowledgement (targeted; broadcast zeroed on reset).
    ActionCooldown(CooldownUpdate),
    /// Stash acknowledgement (targeted; broadcast zeroed on reset).
    PersonalStashUpdate(StashUpdate),
    /// Rejection or misuse warning (targeted).
    ActionFailed(ActionFailure),
    /// Event toggle (broadcast, or targeted on connect).
    EventUpdate(EventUpdate),
    /// Stabilize toggle (broadcast).
    StabilizeEffectUpdate(StabilizeUpdate),
    /// Terminal outcome (broadcast, or targeted on connect).
    GameOver(GameOver),
    /// A new session instance has started (broadcast).
    GameReset,
}

impl ServerMessage {
    /// The wire name of this message, as it appears in the `event` field.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GameStateUpdate(_) => "gameStateUpdate",
            Self::ActionCooldown(_) => "actionCooldown",
            Self::PersonalStashUpdate(_) => "personalStashUpdate",
            Self::ActionFailed(_) => "actionFailed",
            Self::EventUpdate(_) => "eventUpdate",
            Self::StabilizeEffectUpdate(_) => "stabilizeEffectUpdate",
            Self::GameOver(_) => "gameOver",
            Self::GameReset => "gameReset",
        }
    }
}
