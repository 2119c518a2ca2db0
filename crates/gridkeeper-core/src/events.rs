//! Stochastic environmental events.
//!
//! On every check the [`EventScheduler`] runs one Bernoulli trial. A success
//! activates one kind drawn uniformly from the configured catalog for a
//! fixed duration. Events only modulate rates: surge scales decay,
//! efficiency scales generate gain. The scheduler never notices expiry; the
//! tick engine clears an event once its end time has passed.

use gridkeeper_types::{EventKind, EventUpdate, ServerMessage};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::EventConfig;
use crate::gateway::BroadcastGateway;
use crate::state::{ActiveEvent, SharedSimulationState};

/// Periodic event activation with idempotent start and stop.
#[derive(Debug)]
pub struct EventScheduler {
    running: bool,
    /// Trial success probability in `[0, 1]`.
    probability: f64,
    duration_ms: u64,
    catalog: Vec<EventKind>,
    rng: SmallRng,
}

impl EventScheduler {
    /// Build a stopped scheduler from configuration.
    ///
    /// A configured seed makes the trial sequence reproducible; otherwise
    /// the RNG is seeded from the thread-local generator.
    pub fn new(config: &EventConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self::with_rng(config, rng)
    }

    /// Build a stopped scheduler around an explicit RNG.
    pub fn with_rng(config: &EventConfig, rng: SmallRng) -> Self {
        Self {
            running: false,
            probability: (config.chance_percent / 100.0).clamp(0.0, 1.0),
            duration_ms: config.duration_ms,
            catalog: config.kinds.clone(),
            rng,
        }
    }

    /// Begin accepting checks. Calling on a running scheduler does nothing.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            info!(
                chance = self.probability,
                duration_ms = self.duration_ms,
                "Event scheduler started"
            );
        }
    }

    /// Stop accepting checks. Calling on a stopped scheduler does nothing.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("Event scheduler stopped");
        }
    }

    /// Whether checks currently have any effect.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Run one activation trial at `now_ms`.
    ///
    /// Does nothing while stopped, once the instance is terminal, or while
    /// another event is already active. Returns the activated event.
    pub fn check(&mut self, state: &mut SharedSimulationState, now_ms: u64) -> Option<ActiveEvent> {
        if !self.running || !state.is_running() || state.active_event().kind.is_some() {
            return None;
        }
        if !self.rng.random_bool(self.probability) {
            debug!("Event trial failed");
            return None;
        }
        let kind = *self.catalog.choose(&mut self.rng)?;
        let end_time = now_ms.saturating_add(self.duration_ms);
        info!(event = ?kind, end_time, "Event triggered");
        Some(state.activate_event(kind, end_time))
    }

    /// Run one trial and announce a newly activated event to everyone.
    pub fn fire<G: BroadcastGateway>(
        &mut self,
        state: &mut SharedSimulationState,
        now_ms: u64,
        gateway: &mut G,
    ) -> Option<ActiveEvent> {
        let event = self.check(state, now_ms)?;
        gateway.broadcast(&ServerMessage::EventUpdate(EventUpdate {
            event_type: event.kind,
            end_time: event.end_time,
        }));
        Some(event)
    }
}
