//! Shared type definitions for the Gridkeeper simulation.
//!
//! This crate is the single source of truth for the identifiers, closed
//! enumerations, and wire messages used across the workspace. Types
//! defined here flow downstream to `TypeScript` via `ts-rs` for the
//! browser controller and display clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for session identifiers
//! - [`enums`] -- Actions, cooldown slots, events, outcomes, failure reasons
//! - [`messages`] -- Inbound and outbound wire messages

pub mod enums;
pub mod ids;
pub mod messages;

// Re-export all public types at crate root for convenience.
pub use enums::{ActionKind, CooldownAction, EventKind, FailureReason, OutcomeReason};
pub use ids::SessionId;
pub use messages::{
    ActionFailure, ClientMessage, CooldownUpdate, EventUpdate, GameOver, ServerMessage,
    StabilizeUpdate, StashUpdate, StateSnapshot,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings to the `bindings/` directory relative
        // to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::SessionId::export_all();

        // Enums
        let _ = crate::enums::ActionKind::export_all();
        let _ = crate::enums::CooldownAction::export_all();
        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::OutcomeReason::export_all();
        let _ = crate::enums::FailureReason::export_all();

        // Messages
        let _ = crate::messages::ClientMessage::export_all();
        let _ = crate::messages::StateSnapshot::export_all();
        let _ = crate::messages::CooldownUpdate::export_all();
        let _ = crate::messages::StashUpdate::export_all();
        let _ = crate::messages::ActionFailure::export_all();
        let _ = crate::messages::EventUpdate::export_all();
        let _ = crate::messages::StabilizeUpdate::export_all();
        let _ = crate::messages::GameOver::export_all();
        let _ = crate::messages::ServerMessage::export_all();
    }
}
