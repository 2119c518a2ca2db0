//! Tick cycle: the fixed-interval update that drives the grid.
//!
//! Each tick runs these steps in order:
//!
//! 1. **Multiplier** -- stabilize decay multiplier if the effect is active,
//!    else the surge multiplier if a surge is active, else 1.
//! 2. **Stabilize expiry** -- clear an effect whose end has passed.
//! 3. **Event expiry** -- clear an event whose end has passed. Starting
//!    events is the scheduler's job; the tick only notices endings.
//! 4. **Decay** -- `rate x multiplier x interval` seconds, clamped.
//! 5. **Zone timers** -- safe-band time accumulates; each danger timer
//!    accumulates while inside its band and resets on exit.
//! 6. **Terminal check** -- cooperative win, then shutdown, then meltdown.
//!    First match wins.
//! 7. **Publish** -- commit a terminal outcome through the one-shot guard
//!    and announce it, or broadcast the routine snapshot plus any toggles.
//!
//! Steps 1 to 6 live in [`TickEngine::advance`], which is pure apart from
//! the state it mutates. Step 7 is [`TickEngine::tick`].
//!
//! Decay uses the configured interval rather than measured elapsed time, so
//! a run with no actions is exactly reproducible.

use std::time::Duration;

use gridkeeper_types::{
    EventKind, EventUpdate, GameOver, OutcomeReason, ServerMessage, StabilizeUpdate,
};
use tracing::{debug, info};

use crate::actions::broadcast_snapshot;
use crate::config::GameConfig;
use crate::gateway::BroadcastGateway;
use crate::state::SharedSimulationState;
use crate::step::StepContext;

/// What one tick observed and changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Whether the tick ran at all.
    pub ran: bool,
    /// Decay multiplier applied this tick.
    pub decay_multiplier: f64,
    /// Whether anything visible moved.
    pub changed: bool,
    /// The stabilize effect expired this tick.
    pub stabilize_ended: bool,
    /// The active event expired this tick.
    pub event_ended: bool,
    /// Terminal condition detected this tick, before the one-shot guard.
    pub outcome: Option<OutcomeReason>,
}

/// Fixed-interval driver with idempotent start and stop.
#[derive(Debug, Clone)]
pub struct TickEngine {
    running: bool,
    interval_ms: u64,
    base_decay_rate: f64,
    stabilize_decay_multiplier: f64,
    surge_decay_multiplier: f64,
    safe_min: f64,
    safe_max: f64,
    danger_low: f64,
    danger_high: f64,
    coop_target_ms: u64,
    danger_limit_ms: u64,
}

impl TickEngine {
    /// Build a stopped engine from configuration.
    pub const fn new(config: &GameConfig) -> Self {
        Self {
            running: false,
            interval_ms: config.grid.tick_interval_ms,
            base_decay_rate: config.grid.base_decay_rate,
            stabilize_decay_multiplier: config.stabilize.decay_multiplier,
            surge_decay_multiplier: config.events.surge_decay_multiplier,
            safe_min: config.zones.safe_min,
            safe_max: config.zones.safe_max,
            danger_low: config.zones.danger_low_threshold,
            danger_high: config.zones.danger_high_threshold,
            coop_target_ms: config.zones.coop_target_ms(),
            danger_limit_ms: config.zones.danger_limit_ms(),
        }
    }

    /// Begin ticking. Calling on a running engine does nothing.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            info!(interval_ms = self.interval_ms, "Tick engine started");
        }
    }

    /// Stop ticking. Calling on a stopped engine does nothing.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("Tick engine stopped");
        }
    }

    /// Whether ticks currently have any effect.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// The configured tick interval.
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Decay multiplier in force at `now_ms`. Stabilize beats any event.
    pub fn decay_multiplier(&self, state: &SharedSimulationState, now_ms: u64) -> f64 {
        if state.stabilize_active(now_ms) {
            self.stabilize_decay_multiplier
        } else if state.active_event().is_live(EventKind::Surge, now_ms) {
            self.surge_decay_multiplier
        } else {
            1.0
        }
    }

    /// Run steps 1 to 6 against `state`.
    ///
    /// Detects but does not commit a terminal outcome. Does nothing while
    /// the engine is stopped or the instance is already terminal.
    pub fn advance(&self, state: &mut SharedSimulationState, now_ms: u64) -> TickReport {
        if !self.running || !state.is_running() {
            return TickReport::default();
        }

        let mut report = TickReport {
            ran: true,
            decay_multiplier: self.decay_multiplier(state, now_ms),
            ..TickReport::default()
        };

        let grid = state.grid_mut();
        if grid.stabilize_effect_end_time > 0 && now_ms >= grid.stabilize_effect_end_time {
            grid.stabilize_effect_end_time = 0;
            report.stabilize_ended = true;
            report.changed = true;
            info!("Stabilize effect ended");
        }

        let event = state.active_event();
        if event.kind.is_some() && now_ms >= event.end_time {
            state.clear_event();
            report.event_ended = true;
            report.changed = true;
        }

        let interval = Duration::from_millis(self.interval_ms);
        let amount = self.base_decay_rate * report.decay_multiplier * interval.as_secs_f64();
        let before = state.energy_level();
        state.set_energy(before - amount);
        let level = state.energy_level();
        if (level - before).abs() > f64::EPSILON {
            report.changed = true;
        }

        let grid = state.grid_mut();
        if (self.safe_min..=self.safe_max).contains(&level) {
            grid.cumulative_stable_time_ms =
                grid.cumulative_stable_time_ms.saturating_add(self.interval_ms);
        }
        report.changed |= accumulate(
            &mut grid.continuous_time_in_danger_low_ms,
            level < self.danger_low,
            self.interval_ms,
        );
        report.changed |= accumulate(
            &mut grid.continuous_time_in_danger_high_ms,
            level > self.danger_high,
            self.interval_ms,
        );

        report.outcome = if grid.cumulative_stable_time_ms >= self.coop_target_ms {
            Some(OutcomeReason::CoopWin)
        } else if grid.continuous_time_in_danger_low_ms >= self.danger_limit_ms {
            Some(OutcomeReason::Shutdown)
        } else if grid.continuous_time_in_danger_high_ms >= self.danger_limit_ms {
            Some(OutcomeReason::Meltdown)
        } else {
            None
        };

        report
    }

    /// Run a full tick: advance, then commit or publish.
    ///
    /// A terminal outcome stops the scheduler and this engine, clears any
    /// active event and is announced in place of the routine snapshot.
    pub fn tick<G: BroadcastGateway>(&mut self, ctx: &mut StepContext<'_, G>) -> TickReport {
        let report = self.advance(ctx.state, ctx.now_ms);
        if !report.ran {
            return report;
        }

        if let Some(reason) = report.outcome {
            if ctx.state.set_terminal(reason, None) {
                ctx.events.stop();
                self.stop();
                ctx.state.clear_event();
                ctx.gateway.broadcast(&ServerMessage::GameOver(GameOver {
                    reason,
                    winner_id: None,
                }));
            }
            return report;
        }

        if report.changed {
            broadcast_snapshot(ctx.state, ctx.sessions, ctx.gateway);
            if report.stabilize_ended {
                ctx.gateway
                    .broadcast(&ServerMessage::StabilizeEffectUpdate(StabilizeUpdate {
                        active: false,
                        end_timestamp: 0,
                    }));
            }
            if report.event_ended {
                ctx.gateway.broadcast(&ServerMessage::EventUpdate(EventUpdate {
                    event_type: None,
                    end_time: 0,
                }));
            }
        } else {
            debug!("Tick produced no visible change");
        }
        report
    }
}

/// Grow a danger timer while inside its band, otherwise reset it.
/// Returns `true` when a nonzero timer was reset.
fn accumulate(timer: &mut u64, inside: bool, interval_ms: u64) -> bool {
    if inside {
        *timer = timer.saturating_add(interval_ms);
        false
    } else if *timer > 0 {
        *timer = 0;
        true
    } else {
        false
    }
}
