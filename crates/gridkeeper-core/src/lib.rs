//! Grid state, tick cycle, and session coordination for the Gridkeeper
//! simulation.
//!
//! This crate owns the deterministic simulation core: a shared decaying
//! energy grid, per-session cooldowns and stashes, stochastic events, the
//! four player actions, and the one-shot terminal outcome.
//!
//! # Modules
//!
//! - [`actions`] -- The four player actions and their feedback.
//! - [`clock`] -- Injected wall clock, real and manual.
//! - [`config`] -- Configuration loading from `gridkeeper-config.yaml` into
//!   strongly-typed structs.
//! - [`coordinator`] -- [`SessionCoordinator`]: connect, disconnect, reset.
//! - [`error`] -- Action and runtime errors.
//! - [`events`] -- Stochastic event scheduler.
//! - [`gateway`] -- [`BroadcastGateway`] trait and channel implementation.
//! - [`runtime`] -- The single task that owns the coordinator.
//! - [`session`] -- Session records and cooldown ledgers.
//! - [`state`] -- Shared grid state and the one-shot terminal guard.
//! - [`step`] -- Borrowed view handed to each tick or action.
//! - [`tick`] -- The fixed-interval tick cycle.
//! - [`timer`] -- Restartable periodic timer.
//!
//! [`SessionCoordinator`]: coordinator::SessionCoordinator
//! [`BroadcastGateway`]: gateway::BroadcastGateway

pub mod actions;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod gateway;
pub mod runtime;
pub mod session;
pub mod state;
pub mod step;
pub mod tick;
pub mod timer;
