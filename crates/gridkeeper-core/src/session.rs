//! Per-connection session records and the registry that owns them.
//!
//! Each [`Session`] embeds a [`CooldownLedger`] with one end timestamp per
//! gated action. A cooldown is active at time `t` iff `t < end`. The ledger
//! is authoritative: clients only mirror it to render countdowns, and every
//! inbound action is re-validated against it.

use std::collections::BTreeMap;

use gridkeeper_types::{CooldownAction, SessionId};

/// Cooldown end timestamps for the three gated actions.
///
/// `0` means never used (or cleared by a reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownLedger {
    stabilize_end: u64,
    steal_grid_end: u64,
    emergency_adjust_end: u64,
}

impl CooldownLedger {
    /// The stored end timestamp for `action`, active or not.
    pub const fn end(&self, action: CooldownAction) -> u64 {
        match action {
            CooldownAction::Stabilize => self.stabilize_end,
            CooldownAction::StealGrid => self.steal_grid_end,
            CooldownAction::EmergencyAdjust => self.emergency_adjust_end,
        }
    }

    /// Whether `action` is still cooling down at `now_ms`.
    pub const fn is_active(&self, action: CooldownAction, now_ms: u64) -> bool {
        now_ms < self.end(action)
    }

    /// Start a cooldown of `duration_ms` from `now_ms`. Returns the new end.
    pub const fn start(&mut self, action: CooldownAction, now_ms: u64, duration_ms: u64) -> u64 {
        let end = now_ms.saturating_add(duration_ms);
        match action {
            CooldownAction::Stabilize => self.stabilize_end = end,
            CooldownAction::StealGrid => self.steal_grid_end = end,
            CooldownAction::EmergencyAdjust => self.emergency_adjust_end = end,
        }
        end
    }

    /// Every cooldown still running at `now_ms`, with its end timestamp.
    pub fn active(&self, now_ms: u64) -> impl Iterator<Item = (CooldownAction, u64)> + '_ {
        CooldownAction::ALL
            .into_iter()
            .filter(move |action| self.is_active(*action, now_ms))
            .map(move |action| (action, self.end(action)))
    }

    /// Clear every cooldown.
    pub const fn clear(&mut self) {
        *self = Self {
            stabilize_end: 0,
            steal_grid_end: 0,
            emergency_adjust_end: 0,
        };
    }
}

/// One connected session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Stable for the lifetime of the connection.
    pub id: SessionId,
    /// Per-action cooldowns.
    pub cooldowns: CooldownLedger,
    /// Private stash, grown only by stealing.
    pub personal_stash: u32,
}

impl Session {
    /// A fresh session with no cooldowns and an empty stash.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            cooldowns: CooldownLedger::default(),
            personal_stash: 0,
        }
    }

    /// Return cooldowns and stash to their initial values.
    pub const fn reset(&mut self) {
        self.cooldowns.clear();
        self.personal_stash = 0;
    }
}

/// All currently connected sessions, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionRegistry {
    /// An empty registry.
    pub const fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
        }
    }

    /// Register a fresh session. An id already present keeps its record.
    pub fn register(&mut self, id: SessionId) -> &Session {
        self.sessions.entry(id).or_insert_with(|| Session::new(id))
    }

    /// Drop a session. Returns the removed record, if it existed.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Look up a session.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Look up a session for mutation.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of registered sessions as a wire-sized count.
    pub fn player_count(&self) -> u32 {
        u32::try_from(self.sessions.len()).unwrap_or(u32::MAX)
    }

    /// Iterate over all registered sessions.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Reset every registered session's cooldowns and stash in place.
    ///
    /// Sessions are neither removed nor recreated.
    pub fn reset_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.reset();
        }
    }
}
