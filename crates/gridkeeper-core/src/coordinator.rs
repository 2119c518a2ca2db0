//! Session lifecycle and the single owner of all simulation state.
//!
//! The [`SessionCoordinator`] holds the grid, the session registry, the
//! event scheduler, the tick engine and the action processor, and hands
//! them out as a [`StepContext`] for exactly one callback at a time. Every
//! callback reads the clock once and runs to completion.

use gridkeeper_types::{
    ClientMessage, CooldownAction, EventUpdate, GameOver, ServerMessage, SessionId,
    StateSnapshot, StashUpdate,
};
use tracing::{debug, info};

use crate::actions::{ActionProcessor, broadcast_snapshot, cooldown_message};
use crate::clock::Clock;
use crate::config::{ConfigError, GameConfig};
use crate::events::EventScheduler;
use crate::gateway::BroadcastGateway;
use crate::session::SessionRegistry;
use crate::state::{ActiveEvent, SharedSimulationState};
use crate::step::StepContext;
use crate::tick::{TickEngine, TickReport};

/// Owns the simulation and routes lifecycle and inbound events into it.
#[derive(Debug)]
pub struct SessionCoordinator<G, C> {
    state: SharedSimulationState,
    sessions: SessionRegistry,
    events: EventScheduler,
    ticks: TickEngine,
    actions: ActionProcessor,
    gateway: G,
    clock: C,
    config: GameConfig,
}

impl<G: BroadcastGateway, C: Clock> SessionCoordinator<G, C> {
    /// Build a coordinator with the tick engine and scheduler stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is inconsistent.
    pub fn new(config: GameConfig, gateway: G, clock: C) -> Result<Self, ConfigError> {
        let events = EventScheduler::new(&config.events);
        Self::with_scheduler(events, config, gateway, clock)
    }

    /// Build a coordinator around an existing scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is inconsistent.
    pub fn with_scheduler(
        events: EventScheduler,
        config: GameConfig,
        gateway: G,
        clock: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: SharedSimulationState::new(&config),
            sessions: SessionRegistry::new(),
            events,
            ticks: TickEngine::new(&config),
            actions: ActionProcessor::new(&config),
            gateway,
            clock,
            config,
        })
    }

    /// Start the tick engine and the event scheduler.
    pub fn start(&mut self) {
        self.ticks.start();
        self.events.start();
    }

    /// Register a new session and bring it up to date.
    ///
    /// The session receives, in order: a bootstrap snapshot carrying its
    /// stash, the current event, and then either the terminal outcome or
    /// each of its still-active cooldowns.
    pub fn connect(&mut self, session: SessionId) {
        let now_ms = self.clock.now_ms();
        self.sessions.register(session);
        info!(session = %session, players = self.sessions.len(), "Session connected");

        let mut bootstrap = self.state.snapshot(self.sessions.player_count());
        bootstrap.personal_stash = self.sessions.get(session).map(|s| s.personal_stash);
        self.gateway
            .send_to(session, &ServerMessage::GameStateUpdate(bootstrap));

        let event = self.state.active_event();
        self.gateway.send_to(
            session,
            &ServerMessage::EventUpdate(EventUpdate {
                event_type: event.kind,
                end_time: event.end_time,
            }),
        );

        if let Some(outcome) = self.state.final_outcome() {
            self.gateway.send_to(
                session,
                &ServerMessage::GameOver(GameOver {
                    reason: outcome.reason,
                    winner_id: outcome.winner,
                }),
            );
            return;
        }

        let Some(record) = self.sessions.get(session) else {
            return;
        };
        for (action, end) in record.cooldowns.active(now_ms) {
            self.gateway.send_to(session, &cooldown_message(action, end));
        }
    }

    /// Drop a session from the registry and resync everyone else.
    ///
    /// Never resets or ends the shared instance.
    pub fn disconnect(&mut self, session: SessionId) {
        if self.sessions.remove(session).is_none() {
            debug!(session = %session, "Disconnect for unknown session");
            return;
        }
        info!(session = %session, players = self.sessions.len(), "Session disconnected");
        broadcast_snapshot(&self.state, &self.sessions, &mut self.gateway);
    }

    /// Route one inbound message from `session`.
    pub fn handle_message(&mut self, session: SessionId, message: ClientMessage) {
        match message.action() {
            Some(action) => {
                let mut ctx = StepContext {
                    state: &mut self.state,
                    sessions: &mut self.sessions,
                    events: &mut self.events,
                    gateway: &mut self.gateway,
                    now_ms: self.clock.now_ms(),
                };
                self.actions.perform(action, session, &mut ctx);
                // An individual win ends the instance between ticks.
                if !self.state.is_running() {
                    self.ticks.stop();
                }
            }
            None => {
                self.request_reset(session);
            }
        }
    }

    /// Start a fresh instance if the current one has ended.
    ///
    /// Returns `false` and changes nothing while the instance is running.
    pub fn request_reset(&mut self, session: SessionId) -> bool {
        if self.state.is_running() {
            info!(session = %session, "Reset request ignored, game is still running");
            return false;
        }
        info!(session = %session, "Reset requested");

        self.state.reset(&mut self.sessions);
        self.events.start();
        self.ticks.start();

        self.gateway.broadcast(&ServerMessage::GameReset);
        broadcast_snapshot(&self.state, &self.sessions, &mut self.gateway);
        for action in CooldownAction::ALL {
            self.gateway.broadcast(&cooldown_message(action, 0));
        }
        self.gateway
            .broadcast(&ServerMessage::PersonalStashUpdate(StashUpdate {
                personal_stash: 0,
            }));
        true
    }

    /// Run one tick.
    pub fn on_tick(&mut self) -> TickReport {
        let mut ctx = StepContext {
            state: &mut self.state,
            sessions: &mut self.sessions,
            events: &mut self.events,
            gateway: &mut self.gateway,
            now_ms: self.clock.now_ms(),
        };
        self.ticks.tick(&mut ctx)
    }

    /// Run one event activation trial.
    pub fn on_event_check(&mut self) -> Option<ActiveEvent> {
        let now_ms = self.clock.now_ms();
        self.events.fire(&mut self.state, now_ms, &mut self.gateway)
    }

    /// Current broadcast snapshot, without a personal stash.
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot(self.sessions.player_count())
    }

    /// The shared grid state.
    pub const fn state(&self) -> &SharedSimulationState {
        &self.state
    }

    /// Registered sessions.
    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// The tick engine.
    pub const fn tick_engine(&self) -> &TickEngine {
        &self.ticks
    }

    /// The event scheduler.
    pub const fn event_scheduler(&self) -> &EventScheduler {
        &self.events
    }

    /// The validated configuration.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Outbound delivery, for transports that attach connections.
    pub const fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use gridkeeper_types::{CooldownUpdate, EventKind, OutcomeReason};
    use tokio::sync::mpsc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::{ChannelGateway, OUTBOX_CAPACITY};

    type Coordinator = SessionCoordinator<ChannelGateway, ManualClock>;

    fn seeded_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.events.seed = Some(11);
        config
    }

    fn coordinator(config: GameConfig) -> (Coordinator, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let mut coordinator =
            SessionCoordinator::new(config, ChannelGateway::new(), clock.clone()).unwrap();
        coordinator.start();
        (coordinator, clock)
    }

    fn join(coordinator: &mut Coordinator) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        coordinator.gateway_mut().attach(id, tx);
        coordinator.connect(id);
        (id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = GameConfig::default();
        config.events.kinds.clear();
        let result = SessionCoordinator::new(config, ChannelGateway::new(), ManualClock::new(0));
        assert!(result.is_err());
    }

    #[test]
    fn with_scheduler_validates_config() {
        let mut config = GameConfig::default();
        config.grid.min_energy = 100.0;
        config.grid.max_energy = 0.0;
        let events = EventScheduler::new(&config.events);
        let result = SessionCoordinator::with_scheduler(
            events,
            config,
            ChannelGateway::new(),
            ManualClock::new(0),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn individual_win_stops_both_drivers() {
        let mut config = seeded_config();
        config.steal.stash_win_target = 2;
        let (mut c, clock) = coordinator(config);
        let (winner, mut rx) = join(&mut c);
        drain(&mut rx);

        c.handle_message(winner, ClientMessage::StealGrid);

        assert_eq!(
            c.state().final_outcome().map(|o| o.reason),
            Some(OutcomeReason::IndividualWin)
        );
        assert!(!c.tick_engine().is_running());
        assert!(!c.event_scheduler().is_running());

        let level = c.state().energy_level();
        clock.advance(500);
        assert!(!c.on_tick().ran);
        assert_eq!(c.state().energy_level(), level);
    }

    #[test]
    fn connect_sends_bootstrap_and_current_event() {
        let (mut c, _clock) = coordinator(seeded_config());
        let (_, mut rx) = join(&mut c);

        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 2);
        match &msgs[0] {
            ServerMessage::GameStateUpdate(snap) => {
                assert_eq!(snap.personal_stash, Some(0));
                assert_eq!(snap.stash_win_target, 25);
                assert_eq!(snap.player_count, 1);
            }
            other => panic!("expected bootstrap, got {other:?}"),
        }
        assert_eq!(
            msgs[1],
            ServerMessage::EventUpdate(EventUpdate {
                event_type: None,
                end_time: 0,
            })
        );
    }

    #[test]
    fn connect_after_terminal_sends_outcome() {
        let (mut c, _clock) = coordinator(seeded_config());
        let (first, _rx) = join(&mut c);
        c.state.set_terminal(OutcomeReason::IndividualWin, Some(first));

        let (_, mut rx) = join(&mut c);
        let last = drain(&mut rx).pop().unwrap();
        assert_eq!(
            last,
            ServerMessage::GameOver(GameOver {
                reason: OutcomeReason::IndividualWin,
                winner_id: Some(first),
            })
        );
    }

    #[test]
    fn reconnecting_same_id_resends_active_cooldowns() {
        let (mut c, clock) = coordinator(seeded_config());
        let (id, mut rx) = join(&mut c);
        c.handle_message(id, ClientMessage::StealGrid);
        drain(&mut rx);

        clock.advance(1_000);
        c.connect(id);

        let msgs = drain(&mut rx);
        assert_eq!(
            msgs.last().unwrap(),
            &ServerMessage::ActionCooldown(CooldownUpdate {
                action: CooldownAction::StealGrid,
                cooldown_end_timestamp: 1_010_000,
            })
        );
        match &msgs[0] {
            ServerMessage::GameStateUpdate(snap) => assert_eq!(snap.personal_stash, Some(2)),
            other => panic!("expected bootstrap, got {other:?}"),
        }
    }

    #[test]
    fn reconnect_with_fresh_identity_starts_from_zero() {
        let (mut c, _clock) = coordinator(seeded_config());
        let (old, _old_rx) = join(&mut c);
        c.handle_message(old, ClientMessage::StealGrid);
        c.gateway_mut().detach(old);
        c.disconnect(old);

        let (new, mut rx) = join(&mut c);
        assert_ne!(old, new);
        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 2);
        match &msgs[0] {
            ServerMessage::GameStateUpdate(snap) => assert_eq!(snap.personal_stash, Some(0)),
            other => panic!("expected bootstrap, got {other:?}"),
        }
    }

    #[test]
    fn disconnect_keeps_grid_and_resyncs_others() {
        let (mut c, _clock) = coordinator(seeded_config());
        let (a, _rx_a) = join(&mut c);
        let (_b, mut rx_b) = join(&mut c);
        c.handle_message(a, ClientMessage::StealGrid);
        drain(&mut rx_b);
        let energy = c.state().energy_level();

        c.gateway_mut().detach(a);
        c.disconnect(a);

        assert_eq!(c.state().energy_level(), energy);
        assert!(c.state().is_running());
        match drain(&mut rx_b).as_slice() {
            [ServerMessage::GameStateUpdate(snap)] => assert_eq!(snap.player_count, 1),
            other => panic!("expected one snapshot, got {other:?}"),
        }
    }

    #[test]
    fn reset_is_ignored_while_running() {
        let (mut c, _clock) = coordinator(seeded_config());
        let (id, mut rx) = join(&mut c);
        drain(&mut rx);

        c.handle_message(id, ClientMessage::RequestReset);
        assert!(drain(&mut rx).is_empty());
        assert!(c.state().is_running());
    }

    #[test]
    fn reset_round_trip() {
        let mut config = seeded_config();
        config.steal.stash_win_target = 2;
        let (mut c, _clock) = coordinator(config);
        let (winner, mut rx) = join(&mut c);
        let (other, _rx_other) = join(&mut c);
        c.handle_message(other, ClientMessage::Stabilize);
        c.handle_message(winner, ClientMessage::StealGrid);
        assert!(!c.state().is_running());
        assert!(!c.event_scheduler().is_running());
        assert!(!c.tick_engine().is_running());
        drain(&mut rx);

        assert!(c.request_reset(other));

        let fresh = SharedSimulationState::new(c.config());
        assert_eq!(c.state().grid(), fresh.grid());
        for session in c.sessions().iter() {
            assert_eq!(session.personal_stash, 0);
            assert_eq!(session.cooldowns, crate::session::CooldownLedger::default());
        }
        assert_eq!(c.sessions().len(), 2);
        assert!(c.tick_engine().is_running());
        assert!(c.event_scheduler().is_running());

        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 6);
        assert_eq!(msgs[0], ServerMessage::GameReset);
        assert!(matches!(msgs[1], ServerMessage::GameStateUpdate(_)));
        for (msg, action) in msgs[2..5].iter().zip(CooldownAction::ALL) {
            assert_eq!(msg, &cooldown_message(action, 0));
        }
        assert_eq!(
            msgs[5],
            ServerMessage::PersonalStashUpdate(StashUpdate { personal_stash: 0 })
        );
    }

    #[test]
    fn ticks_drive_decay_through_the_clock() {
        let (mut c, clock) = coordinator(seeded_config());
        for _ in 0..4 {
            clock.advance(500);
            c.on_tick();
        }
        assert_eq!(c.state().energy_level(), 49.0);
        assert_eq!(c.snapshot().coop_win_progress_seconds, 2);
    }

    #[test]
    fn event_check_uses_scheduler() {
        let mut config = seeded_config();
        config.events.chance_percent = 100.0;
        config.events.kinds = vec![EventKind::Efficiency];
        let (mut c, _clock) = coordinator(config);
        let (_, mut rx) = join(&mut c);
        drain(&mut rx);

        let event = c.on_event_check().unwrap();
        assert_eq!(event.kind, Some(EventKind::Efficiency));
        assert_eq!(event.end_time, 1_010_000);
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::EventUpdate(EventUpdate {
                event_type: Some(EventKind::Efficiency),
                end_time: 1_010_000,
            })]
        );
    }
}
