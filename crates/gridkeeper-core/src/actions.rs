//! The four player actions.
//!
//! Each operation reads the clock once (the `now_ms` argument), validates
//! its preconditions in a fixed order and then mutates the shared state and
//! the acting session's record. Preconditions are checked in this order:
//!
//! 1. the instance is still running
//! 2. the acting session is registered
//! 3. the action's cooldown has elapsed
//! 4. any resource cost can be paid
//!
//! The first failing check decides the [`ActionError`]. Nothing is mutated
//! on failure.
//!
//! [`ActionProcessor::perform`] dispatches an [`ActionKind`] and publishes
//! the per-action feedback through a [`BroadcastGateway`]: targeted
//! acknowledgements to the caller, and routine or toggle broadcasts to all.

use gridkeeper_types::{
    ActionFailure, ActionKind, CooldownAction, CooldownUpdate, EventKind, FailureReason, GameOver,
    OutcomeReason, ServerMessage, SessionId, StabilizeUpdate, StashUpdate,
};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::error::ActionError;
use crate::gateway::BroadcastGateway;
use crate::session::{Session, SessionRegistry};
use crate::state::SharedSimulationState;
use crate::step::StepContext;

/// Successful stabilize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizeOutcome {
    /// The caller's new cooldown end.
    pub cooldown_end: u64,
    /// When the global effect expires.
    pub effect_end: u64,
}

/// Successful steal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealOutcome {
    /// The caller's new cooldown end.
    pub cooldown_end: u64,
    /// The caller's stash after the steal.
    pub personal_stash: u32,
    /// Whether the stash reached the win target.
    pub reached_target: bool,
}

/// Which emergency branch executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyBranch {
    /// Low danger band: energy added.
    Boost,
    /// High danger band: energy removed.
    Coolant,
    /// Neither danger band: penalty toward the nearer boundary.
    Misuse,
}

/// Successful emergency adjust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmergencyOutcome {
    /// The caller's new cooldown end.
    pub cooldown_end: u64,
    /// The branch chosen from the level at execution time.
    pub branch: EmergencyBranch,
    /// Grid level after the adjustment.
    pub energy_level: f64,
}

/// Action tuning captured from configuration.
#[derive(Debug, Clone)]
pub struct ActionProcessor {
    base_gain: f64,
    stabilize_gain_multiplier: f64,
    efficiency_gain_multiplier: f64,
    stabilize_duration_ms: u64,
    stabilize_cooldown_ms: u64,
    steal_cost: f64,
    steal_stash_gain: u32,
    steal_cooldown_ms: u64,
    emergency_cooldown_ms: u64,
    danger_low: f64,
    danger_high: f64,
    midpoint: f64,
    boost_amount: f64,
    coolant_amount: f64,
    wrong_zone_penalty: f64,
}

impl ActionProcessor {
    /// Capture the action tuning from configuration.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            base_gain: config.grid.base_gain_per_click,
            stabilize_gain_multiplier: config.stabilize.gain_multiplier,
            efficiency_gain_multiplier: config.events.efficiency_gain_multiplier,
            stabilize_duration_ms: config.stabilize.duration_ms,
            stabilize_cooldown_ms: config.stabilize.cooldown_ms,
            steal_cost: config.steal.grid_cost,
            steal_stash_gain: config.steal.stash_gain,
            steal_cooldown_ms: config.steal.cooldown_ms,
            emergency_cooldown_ms: config.emergency.cooldown_ms,
            danger_low: config.zones.danger_low_threshold,
            danger_high: config.zones.danger_high_threshold,
            midpoint: config.energy_midpoint(),
            boost_amount: config.emergency.boost_amount,
            coolant_amount: config.emergency.coolant_amount,
            wrong_zone_penalty: config.emergency.wrong_zone_penalty,
        }
    }

    /// Generate multiplier in force at `now_ms`. Stabilize beats any event.
    pub fn gain_multiplier(&self, state: &SharedSimulationState, now_ms: u64) -> f64 {
        if state.stabilize_active(now_ms) {
            self.stabilize_gain_multiplier
        } else if state.active_event().is_live(EventKind::Efficiency, now_ms) {
            self.efficiency_gain_multiplier
        } else {
            1.0
        }
    }

    /// Add one click's worth of energy. Returns the gain applied.
    ///
    /// # Errors
    ///
    /// [`ActionError::GameNotRunning`] or [`ActionError::UnknownSession`].
    pub fn generate(
        &self,
        state: &mut SharedSimulationState,
        sessions: &SessionRegistry,
        session: SessionId,
        now_ms: u64,
    ) -> Result<f64, ActionError> {
        ensure_running(state)?;
        sessions
            .get(session)
            .ok_or(ActionError::UnknownSession(session))?;

        let gain = self.base_gain * self.gain_multiplier(state, now_ms);
        state.set_energy(state.energy_level() + gain);
        Ok(gain)
    }

    /// Activate the global stabilize effect and start the caller's cooldown.
    ///
    /// # Errors
    ///
    /// [`ActionError::OnCooldown`] carries the existing cooldown end so the
    /// caller can resynchronize. Also [`ActionError::GameNotRunning`] and
    /// [`ActionError::UnknownSession`].
    pub fn stabilize(
        &self,
        state: &mut SharedSimulationState,
        sessions: &mut SessionRegistry,
        session: SessionId,
        now_ms: u64,
    ) -> Result<StabilizeOutcome, ActionError> {
        ensure_running(state)?;
        let record = ready_session(sessions, session, CooldownAction::Stabilize, now_ms)?;

        let effect_end = now_ms.saturating_add(self.stabilize_duration_ms);
        state.activate_stabilize(effect_end);
        let cooldown_end =
            record
                .cooldowns
                .start(CooldownAction::Stabilize, now_ms, self.stabilize_cooldown_ms);

        info!(session = %session, effect_end, "Stabilize activated");
        Ok(StabilizeOutcome {
            cooldown_end,
            effect_end,
        })
    }

    /// Move energy from the grid into the caller's stash.
    ///
    /// Does not decide the outcome: the caller commits an individual win
    /// through [`SharedSimulationState::set_terminal`] when
    /// [`StealOutcome::reached_target`] is set.
    ///
    /// # Errors
    ///
    /// [`ActionError::GameNotRunning`], [`ActionError::UnknownSession`],
    /// [`ActionError::OnCooldown`] or [`ActionError::InsufficientEnergy`],
    /// whichever check fails first.
    pub fn steal_grid(
        &self,
        state: &mut SharedSimulationState,
        sessions: &mut SessionRegistry,
        session: SessionId,
        now_ms: u64,
    ) -> Result<StealOutcome, ActionError> {
        ensure_running(state)?;
        let record = ready_session(sessions, session, CooldownAction::StealGrid, now_ms)?;

        let available = state.energy_level();
        if available < self.steal_cost {
            return Err(ActionError::InsufficientEnergy {
                available,
                required: self.steal_cost,
            });
        }

        state.set_energy(available - self.steal_cost);
        record.personal_stash = record.personal_stash.saturating_add(self.steal_stash_gain);
        let cooldown_end =
            record
                .cooldowns
                .start(CooldownAction::StealGrid, now_ms, self.steal_cooldown_ms);
        let reached_target = record.personal_stash >= state.stash_win_target();

        info!(
            session = %session,
            stash = record.personal_stash,
            reached_target,
            "Grid energy stolen"
        );
        Ok(StealOutcome {
            cooldown_end,
            personal_stash: record.personal_stash,
            reached_target,
        })
    }

    /// Apply the emergency branch chosen by the grid's current level.
    ///
    /// Below the low threshold boosts, above the high threshold cools.
    /// Anywhere else is misuse: the penalty is subtracted at or below the
    /// range midpoint and added above it. Every branch starts the cooldown.
    ///
    /// # Errors
    ///
    /// [`ActionError::GameNotRunning`], [`ActionError::UnknownSession`] or
    /// [`ActionError::OnCooldown`].
    pub fn emergency_adjust(
        &self,
        state: &mut SharedSimulationState,
        sessions: &mut SessionRegistry,
        session: SessionId,
        now_ms: u64,
    ) -> Result<EmergencyOutcome, ActionError> {
        ensure_running(state)?;
        let record = ready_session(sessions, session, CooldownAction::EmergencyAdjust, now_ms)?;

        let level = state.energy_level();
        let (branch, delta) = if level < self.danger_low {
            (EmergencyBranch::Boost, self.boost_amount)
        } else if level > self.danger_high {
            (EmergencyBranch::Coolant, -self.coolant_amount)
        } else if level <= self.midpoint {
            (EmergencyBranch::Misuse, -self.wrong_zone_penalty)
        } else {
            (EmergencyBranch::Misuse, self.wrong_zone_penalty)
        };

        state.set_energy(level + delta);
        let cooldown_end = record.cooldowns.start(
            CooldownAction::EmergencyAdjust,
            now_ms,
            self.emergency_cooldown_ms,
        );

        info!(session = %session, branch = ?branch, delta, "Emergency adjust applied");
        Ok(EmergencyOutcome {
            cooldown_end,
            branch,
            energy_level: state.energy_level(),
        })
    }

    /// Run `action` for `session` and publish its feedback.
    pub fn perform<G: BroadcastGateway>(
        &self,
        action: ActionKind,
        session: SessionId,
        ctx: &mut StepContext<'_, G>,
    ) {
        match action {
            ActionKind::Generate => self.perform_generate(session, ctx),
            ActionKind::Stabilize => self.perform_stabilize(session, ctx),
            ActionKind::StealGrid => self.perform_steal(session, ctx),
            ActionKind::EmergencyAdjust => self.perform_emergency(session, ctx),
        }
    }

    /// Generate replies to nobody; the next tick broadcast carries the change.
    fn perform_generate<G: BroadcastGateway>(
        &self,
        session: SessionId,
        ctx: &mut StepContext<'_, G>,
    ) {
        if let Err(err) = self.generate(ctx.state, ctx.sessions, session, ctx.now_ms) {
            debug!(session = %session, error = %err, "Generate ignored");
        }
    }

    fn perform_stabilize<G: BroadcastGateway>(
        &self,
        session: SessionId,
        ctx: &mut StepContext<'_, G>,
    ) {
        let action = CooldownAction::Stabilize;
        match self.stabilize(ctx.state, ctx.sessions, session, ctx.now_ms) {
            Ok(outcome) => {
                ctx.gateway
                    .send_to(session, &cooldown_message(action, outcome.cooldown_end));
                ctx.gateway
                    .broadcast(&ServerMessage::StabilizeEffectUpdate(StabilizeUpdate {
                        active: true,
                        end_timestamp: outcome.effect_end,
                    }));
            }
            Err(ActionError::OnCooldown { until }) => {
                debug!(session = %session, until, "Stabilize blocked by cooldown");
                ctx.gateway.send_to(session, &cooldown_message(action, until));
            }
            Err(err) => report_failure(ctx.gateway, session, action, &err),
        }
    }

    fn perform_steal<G: BroadcastGateway>(&self, session: SessionId, ctx: &mut StepContext<'_, G>) {
        let action = CooldownAction::StealGrid;
        let outcome = match self.steal_grid(ctx.state, ctx.sessions, session, ctx.now_ms) {
            Ok(outcome) => outcome,
            Err(err) => {
                report_failure(ctx.gateway, session, action, &err);
                return;
            }
        };

        ctx.gateway
            .send_to(session, &cooldown_message(action, outcome.cooldown_end));
        ctx.gateway.send_to(
            session,
            &ServerMessage::PersonalStashUpdate(StashUpdate {
                personal_stash: outcome.personal_stash,
            }),
        );

        if outcome.reached_target
            && ctx
                .state
                .set_terminal(OutcomeReason::IndividualWin, Some(session))
        {
            ctx.events.stop();
            ctx.state.clear_event();
            ctx.gateway.broadcast(&ServerMessage::GameOver(GameOver {
                reason: OutcomeReason::IndividualWin,
                winner_id: Some(session),
            }));
        } else {
            broadcast_snapshot(ctx.state, ctx.sessions, ctx.gateway);
        }
    }

    fn perform_emergency<G: BroadcastGateway>(
        &self,
        session: SessionId,
        ctx: &mut StepContext<'_, G>,
    ) {
        let action = CooldownAction::EmergencyAdjust;
        let outcome = match self.emergency_adjust(ctx.state, ctx.sessions, session, ctx.now_ms) {
            Ok(outcome) => outcome,
            Err(err) => {
                report_failure(ctx.gateway, session, action, &err);
                return;
            }
        };

        ctx.gateway
            .send_to(session, &cooldown_message(action, outcome.cooldown_end));
        if outcome.branch == EmergencyBranch::Misuse {
            ctx.gateway.send_to(
                session,
                &ServerMessage::ActionFailed(ActionFailure {
                    action,
                    reason: FailureReason::WrongZone,
                }),
            );
        }
        broadcast_snapshot(ctx.state, ctx.sessions, ctx.gateway);
    }
}

fn ensure_running(state: &SharedSimulationState) -> Result<(), ActionError> {
    if state.is_running() {
        Ok(())
    } else {
        Err(ActionError::GameNotRunning)
    }
}

/// Look up `session` and check that `action` is off cooldown.
fn ready_session(
    sessions: &mut SessionRegistry,
    session: SessionId,
    action: CooldownAction,
    now_ms: u64,
) -> Result<&mut Session, ActionError> {
    let record = sessions
        .get_mut(session)
        .ok_or(ActionError::UnknownSession(session))?;
    if record.cooldowns.is_active(action, now_ms) {
        return Err(ActionError::OnCooldown {
            until: record.cooldowns.end(action),
        });
    }
    Ok(record)
}

pub(crate) const fn cooldown_message(action: CooldownAction, end: u64) -> ServerMessage {
    ServerMessage::ActionCooldown(CooldownUpdate {
        action,
        cooldown_end_timestamp: end,
    })
}

pub(crate) fn broadcast_snapshot<G: BroadcastGateway>(
    state: &SharedSimulationState,
    sessions: &SessionRegistry,
    gateway: &mut G,
) {
    gateway.broadcast(&ServerMessage::GameStateUpdate(
        state.snapshot(sessions.player_count()),
    ));
}

/// Tell the caller why its action was rejected. A cooldown rejection also
/// resends the existing cooldown end.
fn report_failure<G: BroadcastGateway>(
    gateway: &mut G,
    session: SessionId,
    action: CooldownAction,
    err: &ActionError,
) {
    debug!(session = %session, action = ?action, error = %err, "Action rejected");
    gateway.send_to(
        session,
        &ServerMessage::ActionFailed(ActionFailure {
            action,
            reason: err.reason(),
        }),
    );
    if let ActionError::OnCooldown { until } = *err {
        gateway.send_to(session, &cooldown_message(action, until));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tokio::sync::mpsc;

    use super::*;
    use crate::events::EventScheduler;
    use crate::gateway::{ChannelGateway, OUTBOX_CAPACITY};

    struct Fixture {
        config: GameConfig,
        actions: ActionProcessor,
        state: SharedSimulationState,
        sessions: SessionRegistry,
        events: EventScheduler,
        gateway: ChannelGateway,
        player: SessionId,
        inbox: mpsc::Receiver<ServerMessage>,
    }

    impl Fixture {
        fn new(config: GameConfig) -> Self {
            let mut sessions = SessionRegistry::new();
            let player = SessionId::new();
            sessions.register(player);
            let mut gateway = ChannelGateway::new();
            let (tx, inbox) = mpsc::channel(OUTBOX_CAPACITY);
            gateway.attach(player, tx);
            let mut events = EventScheduler::with_rng(&config.events, SmallRng::seed_from_u64(1));
            events.start();
            Self {
                actions: ActionProcessor::new(&config),
                state: SharedSimulationState::new(&config),
                sessions,
                events,
                gateway,
                player,
                inbox,
                config,
            }
        }

        fn perform(&mut self, action: ActionKind, now_ms: u64) {
            let mut ctx = StepContext {
                state: &mut self.state,
                sessions: &mut self.sessions,
                events: &mut self.events,
                gateway: &mut self.gateway,
                now_ms,
            };
            self.actions.perform(action, self.player, &mut ctx);
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.inbox.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn fixture() -> Fixture {
        Fixture::new(GameConfig::default())
    }

    // -----------------------------------------------------------------------
    // generate
    // -----------------------------------------------------------------------

    #[test]
    fn generate_adds_base_gain() {
        let mut f = fixture();
        let gain = f
            .actions
            .generate(&mut f.state, &f.sessions, f.player, 0)
            .unwrap();
        assert_eq!(gain, 1.0);
        assert_eq!(f.state.energy_level(), 51.0);
    }

    #[test]
    fn generate_prefers_stabilize_over_efficiency() {
        let mut f = fixture();
        f.state.activate_event(EventKind::Efficiency, 10_000);
        assert_eq!(
            f.actions.generate(&mut f.state, &f.sessions, f.player, 0).unwrap(),
            2.0
        );

        f.state.activate_stabilize(10_000);
        assert_eq!(
            f.actions.generate(&mut f.state, &f.sessions, f.player, 0).unwrap(),
            0.5
        );
    }

    #[test]
    fn generate_clamps_at_max() {
        let mut f = fixture();
        f.state.set_energy(99.5);
        f.actions
            .generate(&mut f.state, &f.sessions, f.player, 0)
            .unwrap();
        assert_eq!(f.state.energy_level(), 100.0);
    }

    #[test]
    fn generate_is_silent() {
        let mut f = fixture();
        f.perform(ActionKind::Generate, 0);
        f.state.set_terminal(OutcomeReason::Shutdown, None);
        f.perform(ActionKind::Generate, 0);
        assert!(f.drain().is_empty());
        assert_eq!(f.state.energy_level(), 51.0);
    }

    #[test]
    fn generate_unknown_session_fails() {
        let mut f = fixture();
        let stranger = SessionId::new();
        assert_eq!(
            f.actions.generate(&mut f.state, &f.sessions, stranger, 0),
            Err(ActionError::UnknownSession(stranger))
        );
    }

    // -----------------------------------------------------------------------
    // stabilize
    // -----------------------------------------------------------------------

    #[test]
    fn stabilize_sets_effect_and_cooldown() {
        let mut f = fixture();
        let outcome = f
            .actions
            .stabilize(&mut f.state, &mut f.sessions, f.player, 1_000)
            .unwrap();
        assert_eq!(outcome.effect_end, 6_000);
        assert_eq!(outcome.cooldown_end, 16_000);
        assert!(f.state.stabilize_active(5_999));
    }

    #[test]
    fn stabilize_on_cooldown_reports_existing_end_without_mutation() {
        let mut f = fixture();
        f.actions
            .stabilize(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        let err = f
            .actions
            .stabilize(&mut f.state, &mut f.sessions, f.player, 7_000)
            .unwrap_err();
        assert_eq!(err, ActionError::OnCooldown { until: 15_000 });
        assert_eq!(f.state.grid().stabilize_effect_end_time, 5_000);
    }

    #[test]
    fn stabilize_feedback() {
        let mut f = fixture();
        f.perform(ActionKind::Stabilize, 0);
        assert_eq!(
            f.drain(),
            vec![
                cooldown_message(CooldownAction::Stabilize, 15_000),
                ServerMessage::StabilizeEffectUpdate(StabilizeUpdate {
                    active: true,
                    end_timestamp: 5_000,
                }),
            ]
        );

        f.perform(ActionKind::Stabilize, 1_000);
        assert_eq!(
            f.drain(),
            vec![cooldown_message(CooldownAction::Stabilize, 15_000)]
        );
    }

    #[test]
    fn stabilize_after_terminal_reports_failure() {
        let mut f = fixture();
        f.state.set_terminal(OutcomeReason::Meltdown, None);
        f.perform(ActionKind::Stabilize, 0);
        assert_eq!(
            f.drain(),
            vec![ServerMessage::ActionFailed(ActionFailure {
                action: CooldownAction::Stabilize,
                reason: FailureReason::GameNotRunning,
            })]
        );
    }

    // -----------------------------------------------------------------------
    // stealGrid
    // -----------------------------------------------------------------------

    #[test]
    fn steal_moves_energy_into_stash() {
        let mut f = fixture();
        let outcome = f
            .actions
            .steal_grid(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        assert_eq!(outcome.personal_stash, 2);
        assert_eq!(outcome.cooldown_end, 10_000);
        assert!(!outcome.reached_target);
        assert_eq!(f.state.energy_level(), 45.0);
    }

    #[test]
    fn steal_checks_cooldown_before_energy() {
        let mut f = fixture();
        f.actions
            .steal_grid(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        f.state.set_energy(1.0);

        let err = f
            .actions
            .steal_grid(&mut f.state, &mut f.sessions, f.player, 5_000)
            .unwrap_err();
        assert_eq!(err, ActionError::OnCooldown { until: 10_000 });

        let err = f
            .actions
            .steal_grid(&mut f.state, &mut f.sessions, f.player, 10_000)
            .unwrap_err();
        assert_eq!(err.reason(), FailureReason::InsufficientEnergy);
        assert_eq!(f.sessions.get(f.player).unwrap().personal_stash, 2);
    }

    #[test]
    fn steal_failure_feedback_is_targeted() {
        let mut f = fixture();
        let other = SessionId::new();
        f.sessions.register(other);
        let (tx, mut other_inbox) = mpsc::channel(OUTBOX_CAPACITY);
        f.gateway.attach(other, tx);

        f.state.set_energy(2.0);
        f.perform(ActionKind::StealGrid, 0);

        assert_eq!(
            f.drain(),
            vec![ServerMessage::ActionFailed(ActionFailure {
                action: CooldownAction::StealGrid,
                reason: FailureReason::InsufficientEnergy,
            })]
        );
        assert!(other_inbox.try_recv().is_err());
    }

    #[test]
    fn steal_cooldown_feedback_resends_cooldown() {
        let mut f = fixture();
        f.perform(ActionKind::StealGrid, 0);
        f.drain();
        f.perform(ActionKind::StealGrid, 1_000);
        assert_eq!(
            f.drain(),
            vec![
                ServerMessage::ActionFailed(ActionFailure {
                    action: CooldownAction::StealGrid,
                    reason: FailureReason::Cooldown,
                }),
                cooldown_message(CooldownAction::StealGrid, 10_000),
            ]
        );
    }

    #[test]
    fn steal_success_broadcasts_snapshot() {
        let mut f = fixture();
        f.perform(ActionKind::StealGrid, 0);
        let msgs = f.drain();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], cooldown_message(CooldownAction::StealGrid, 10_000));
        assert_eq!(
            msgs[1],
            ServerMessage::PersonalStashUpdate(StashUpdate { personal_stash: 2 })
        );
        match &msgs[2] {
            ServerMessage::GameStateUpdate(snap) => {
                assert_eq!(snap.energy_level, 45.0);
                assert_eq!(snap.personal_stash, None);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn repeated_steals_reach_individual_win() {
        let mut config = GameConfig::default();
        config.steal.stash_win_target = 6;
        let mut f = Fixture::new(config);
        f.state.activate_event(EventKind::Surge, 100_000);

        let cooldown = f.config.steal.cooldown_ms;
        for round in 0..3 {
            f.perform(ActionKind::StealGrid, round * cooldown);
        }

        let outcome = f.state.final_outcome().unwrap();
        assert_eq!(outcome.reason, OutcomeReason::IndividualWin);
        assert_eq!(outcome.winner, Some(f.player));
        assert!(!f.events.is_running());
        assert_eq!(f.state.active_event().kind, None);

        let last = f.drain().pop().unwrap();
        assert_eq!(
            last,
            ServerMessage::GameOver(GameOver {
                reason: OutcomeReason::IndividualWin,
                winner_id: Some(f.player),
            })
        );
    }

    #[test]
    fn steal_after_other_terminal_is_rejected() {
        let mut f = fixture();
        f.state.set_terminal(OutcomeReason::CoopWin, None);
        let err = f
            .actions
            .steal_grid(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap_err();
        assert_eq!(err, ActionError::GameNotRunning);
        assert_eq!(f.state.final_outcome().unwrap().reason, OutcomeReason::CoopWin);
    }

    // -----------------------------------------------------------------------
    // emergencyAdjust
    // -----------------------------------------------------------------------

    #[test]
    fn emergency_misuse_at_midpoint_moves_toward_min() {
        let mut f = fixture();
        let outcome = f
            .actions
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        assert_eq!(outcome.branch, EmergencyBranch::Misuse);
        assert_eq!(outcome.energy_level, 45.0);
        assert_eq!(outcome.cooldown_end, 20_000);
    }

    #[test]
    fn emergency_misuse_above_midpoint_moves_toward_max() {
        let mut f = fixture();
        f.state.set_energy(60.0);
        let outcome = f
            .actions
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        assert_eq!(outcome.branch, EmergencyBranch::Misuse);
        assert_eq!(outcome.energy_level, 65.0);
    }

    #[test]
    fn emergency_boost_and_coolant_clamp() {
        let mut f = fixture();
        f.state.set_energy(10.0);
        let boost = f
            .actions
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        assert_eq!(boost.branch, EmergencyBranch::Boost);
        assert_eq!(boost.energy_level, 25.0);

        f.state.set_energy(95.0);
        let coolant = f
            .actions
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 20_000)
            .unwrap();
        assert_eq!(coolant.branch, EmergencyBranch::Coolant);
        assert_eq!(coolant.energy_level, 75.0);

        f.state.set_energy(5.0);
        f.sessions.get_mut(f.player).unwrap().cooldowns.clear();
        let mut config = GameConfig::default();
        config.emergency.boost_amount = 500.0;
        let strong = ActionProcessor::new(&config);
        let clamped = strong
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 40_000)
            .unwrap();
        assert_eq!(clamped.energy_level, 100.0);
    }

    #[test]
    fn emergency_misuse_feedback() {
        let mut f = fixture();
        f.perform(ActionKind::EmergencyAdjust, 0);
        let msgs = f.drain();
        assert_eq!(msgs.len(), 3);
        assert_eq!(
            msgs[0],
            cooldown_message(CooldownAction::EmergencyAdjust, 20_000)
        );
        assert_eq!(
            msgs[1],
            ServerMessage::ActionFailed(ActionFailure {
                action: CooldownAction::EmergencyAdjust,
                reason: FailureReason::WrongZone,
            })
        );
        assert!(matches!(msgs[2], ServerMessage::GameStateUpdate(_)));
    }

    #[test]
    fn emergency_on_cooldown_has_no_free_retry() {
        let mut f = fixture();
        f.actions
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 0)
            .unwrap();
        let err = f
            .actions
            .emergency_adjust(&mut f.state, &mut f.sessions, f.player, 19_999)
            .unwrap_err();
        assert_eq!(err, ActionError::OnCooldown { until: 20_000 });
        assert_eq!(f.state.energy_level(), 45.0);
    }
}
