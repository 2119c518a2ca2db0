//! The authoritative grid state and its one-shot terminal transition.
//!
//! [`SharedSimulationState`] is mutated only by the tick engine and the
//! action processor. Broadcasts read it through [`SharedSimulationState::snapshot`],
//! which always recomputes the full view.

use gridkeeper_types::{EventKind, OutcomeReason, SessionId, StateSnapshot};
use tracing::info;

use crate::config::GameConfig;
use crate::session::SessionRegistry;

/// The environmental event currently in force, if any.
///
/// At most one event is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveEvent {
    /// The event kind, or `None` when no event is active.
    pub kind: Option<EventKind>,
    /// When the event ends, or `0`.
    pub end_time: u64,
}

impl ActiveEvent {
    /// No event.
    pub const NONE: Self = Self {
        kind: None,
        end_time: 0,
    };

    /// Whether `kind` is active and has not yet expired at `now_ms`.
    pub fn is_live(&self, kind: EventKind, now_ms: u64) -> bool {
        self.kind == Some(kind) && now_ms < self.end_time
    }
}

/// The one-shot terminal result of a session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalOutcome {
    /// Why the instance ended.
    pub reason: OutcomeReason,
    /// The winner for an individual win.
    pub winner: Option<SessionId>,
}

/// Raw grid fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    /// Current energy, always within the configured range.
    pub energy_level: f64,
    /// Total milliseconds spent in the safe band.
    pub cumulative_stable_time_ms: u64,
    /// Continuous milliseconds in the low danger band.
    pub continuous_time_in_danger_low_ms: u64,
    /// Continuous milliseconds in the high danger band.
    pub continuous_time_in_danger_high_ms: u64,
    /// End of the stabilize effect, or `0` when inactive.
    pub stabilize_effect_end_time: u64,
    /// Current environmental event.
    pub active_event: ActiveEvent,
    /// `false` once a terminal outcome is recorded.
    pub game_is_running: bool,
    /// Set exactly once per instance.
    pub final_outcome: Option<FinalOutcome>,
}

impl GridState {
    /// A fresh running grid at `initial_energy`.
    pub const fn new(initial_energy: f64) -> Self {
        Self {
            energy_level: initial_energy,
            cumulative_stable_time_ms: 0,
            continuous_time_in_danger_low_ms: 0,
            continuous_time_in_danger_high_ms: 0,
            stabilize_effect_end_time: 0,
            active_event: ActiveEvent::NONE,
            game_is_running: true,
            final_outcome: None,
        }
    }
}

/// The grid plus the fixed values its snapshot reports.
#[derive(Debug, Clone)]
pub struct SharedSimulationState {
    grid: GridState,
    initial_energy: f64,
    min_energy: f64,
    max_energy: f64,
    coop_win_target_seconds: u64,
    stash_win_target: u32,
}

impl SharedSimulationState {
    /// Build the initial state from configuration.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            grid: GridState::new(config.grid.initial_energy),
            initial_energy: config.grid.initial_energy,
            min_energy: config.grid.min_energy,
            max_energy: config.grid.max_energy,
            coop_win_target_seconds: config.zones.coop_win_duration_seconds,
            stash_win_target: config.steal.stash_win_target,
        }
    }

    /// Read-only view of the raw grid fields.
    pub const fn grid(&self) -> &GridState {
        &self.grid
    }

    /// Current energy.
    pub const fn energy_level(&self) -> f64 {
        self.grid.energy_level
    }

    /// Whether the instance is still running.
    pub const fn is_running(&self) -> bool {
        self.grid.game_is_running
    }

    /// The recorded terminal outcome, if any.
    pub const fn final_outcome(&self) -> Option<FinalOutcome> {
        self.grid.final_outcome
    }

    /// The current event record.
    pub const fn active_event(&self) -> ActiveEvent {
        self.grid.active_event
    }

    /// Stash needed for an individual win.
    pub const fn stash_win_target(&self) -> u32 {
        self.stash_win_target
    }

    /// Whether the stabilize effect is in force at `now_ms`.
    pub const fn stabilize_active(&self, now_ms: u64) -> bool {
        now_ms < self.grid.stabilize_effect_end_time
    }

    /// Set the energy level, clamped into the configured range.
    pub fn set_energy(&mut self, value: f64) {
        self.grid.energy_level = value.clamp(self.min_energy, self.max_energy);
    }

    /// Mutable access to the raw grid for the tick engine and actions.
    pub(crate) const fn grid_mut(&mut self) -> &mut GridState {
        &mut self.grid
    }

    /// Activate the stabilize effect until `end_ms`.
    pub const fn activate_stabilize(&mut self, end_ms: u64) {
        self.grid.stabilize_effect_end_time = end_ms;
    }

    /// Activate `kind` until `end_ms`, replacing whatever was there.
    pub const fn activate_event(&mut self, kind: EventKind, end_ms: u64) -> ActiveEvent {
        self.grid.active_event = ActiveEvent {
            kind: Some(kind),
            end_time: end_ms,
        };
        self.grid.active_event
    }

    /// Clear the active event. Returns the kind that was cleared, if any.
    pub fn clear_event(&mut self) -> Option<EventKind> {
        let cleared = self.grid.active_event.kind;
        if let Some(kind) = cleared {
            info!(event = ?kind, "Event ended");
        }
        self.grid.active_event = ActiveEvent::NONE;
        cleared
    }

    /// Record the terminal outcome.
    ///
    /// This is the single guard between tick-driven and action-driven
    /// terminal conditions: the first caller wins and gets `true`, every
    /// later caller is a no-op and gets `false`.
    pub fn set_terminal(&mut self, reason: OutcomeReason, winner: Option<SessionId>) -> bool {
        if !self.grid.game_is_running {
            return false;
        }
        self.grid.game_is_running = false;
        self.grid.final_outcome = Some(FinalOutcome { reason, winner });
        info!(reason = ?reason, winner = ?winner, "Session instance reached terminal outcome");
        true
    }

    /// Restore every grid field to its initial value and reset every
    /// still-registered session's cooldowns and stash.
    pub fn reset(&mut self, sessions: &mut SessionRegistry) {
        self.grid = GridState::new(self.initial_energy);
        sessions.reset_all();
        info!(sessions = sessions.len(), "Grid state reset");
    }

    /// Full view of the grid for broadcasting.
    pub fn snapshot(&self, player_count: u32) -> StateSnapshot {
        let outcome = self.grid.final_outcome;
        StateSnapshot {
            energy_level: self.grid.energy_level,
            player_count,
            coop_win_target_seconds: self.coop_win_target_seconds,
            coop_win_progress_seconds: self.grid.cumulative_stable_time_ms / 1000,
            game_is_running: self.grid.game_is_running,
            final_outcome_reason: outcome.map(|o| o.reason),
            final_outcome_winner: outcome.and_then(|o| o.winner),
            active_event_type: self.grid.active_event.kind,
            active_event_end_time: self.grid.active_event.end_time,
            stash_win_target: self.stash_win_target,
            personal_stash: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use gridkeeper_types::CooldownAction;

    use super::*;

    fn state() -> SharedSimulationState {
        SharedSimulationState::new(&GameConfig::default())
    }

    #[test]
    fn initial_snapshot_matches_config() {
        let snap = state().snapshot(3);
        assert_eq!(snap.energy_level, 50.0);
        assert_eq!(snap.player_count, 3);
        assert_eq!(snap.coop_win_target_seconds, 60);
        assert_eq!(snap.coop_win_progress_seconds, 0);
        assert!(snap.game_is_running);
        assert_eq!(snap.final_outcome_reason, None);
        assert_eq!(snap.active_event_type, None);
        assert_eq!(snap.stash_win_target, 25);
        assert_eq!(snap.personal_stash, None);
    }

    #[test]
    fn set_terminal_is_one_shot() {
        let mut state = state();
        let winner = SessionId::new();
        assert!(state.set_terminal(OutcomeReason::IndividualWin, Some(winner)));
        assert!(!state.set_terminal(OutcomeReason::Meltdown, None));

        let outcome = state.final_outcome().unwrap();
        assert_eq!(outcome.reason, OutcomeReason::IndividualWin);
        assert_eq!(outcome.winner, Some(winner));
        assert!(!state.is_running());
    }

    #[test]
    fn set_energy_clamps_to_range() {
        let mut state = state();
        state.set_energy(140.0);
        assert_eq!(state.energy_level(), 100.0);
        state.set_energy(-3.0);
        assert_eq!(state.energy_level(), 0.0);
    }

    #[test]
    fn progress_seconds_floor() {
        let mut state = state();
        state.grid_mut().cumulative_stable_time_ms = 4_999;
        assert_eq!(state.snapshot(0).coop_win_progress_seconds, 4);
    }

    #[test]
    fn event_liveness_respects_kind_and_end() {
        let mut state = state();
        state.activate_event(EventKind::Surge, 1_000);
        let event = state.active_event();
        assert!(event.is_live(EventKind::Surge, 999));
        assert!(!event.is_live(EventKind::Surge, 1_000));
        assert!(!event.is_live(EventKind::Efficiency, 0));
        assert_eq!(state.clear_event(), Some(EventKind::Surge));
        assert_eq!(state.clear_event(), None);
    }

    #[test]
    fn reset_restores_initial_values_and_sessions() {
        let mut state = state();
        let mut sessions = SessionRegistry::new();
        let id = SessionId::new();
        sessions.register(id);
        {
            let session = sessions.get_mut(id).unwrap();
            session.personal_stash = 6;
            session.cooldowns.start(CooldownAction::Stabilize, 0, 15_000);
        }
        state.set_energy(90.0);
        state.activate_stabilize(5_000);
        state.activate_event(EventKind::Efficiency, 9_000);
        state.grid_mut().cumulative_stable_time_ms = 12_000;
        state.set_terminal(OutcomeReason::CoopWin, None);

        state.reset(&mut sessions);

        assert_eq!(state.grid(), &GridState::new(50.0));
        let session = sessions.get(id).unwrap();
        assert_eq!(session.personal_stash, 0);
        assert!(!session.cooldowns.is_active(CooldownAction::Stabilize, 0));
        assert_eq!(sessions.len(), 1);
    }
}
