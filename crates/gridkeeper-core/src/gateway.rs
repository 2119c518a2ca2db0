//! Outbound fan-out to connected sessions.
//!
//! The simulation never talks to a transport directly. It emits
//! [`ServerMessage`]s through a [`BroadcastGateway`], either to the session
//! that triggered an action or to every connected session.

use std::collections::BTreeMap;

use gridkeeper_types::{ServerMessage, SessionId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Delivery of outbound messages.
///
/// Implementations must not block: the caller is mid-way through a
/// run-to-completion step.
pub trait BroadcastGateway {
    /// Send a message only to `session`. Unknown sessions are ignored.
    fn send_to(&mut self, session: SessionId, message: &ServerMessage);

    /// Send a message to every connected session.
    fn broadcast(&mut self, message: &ServerMessage);
}

/// Messages a connection may have queued before it is dropped as too slow.
pub const OUTBOX_CAPACITY: usize = 256;

/// Gateway backed by one bounded channel per connection.
///
/// The transport attaches a sender on connect and detaches it on
/// disconnect. A send to a connection whose receiver is already gone is
/// dropped; the matching disconnect will follow. A connection whose outbox
/// is full is detached on the spot: dropping the sender ends its writer,
/// which in turn closes the socket and reports the disconnect.
#[derive(Debug, Default)]
pub struct ChannelGateway {
    outboxes: BTreeMap<SessionId, mpsc::Sender<ServerMessage>>,
}

impl ChannelGateway {
    /// A gateway with no connections.
    pub const fn new() -> Self {
        Self {
            outboxes: BTreeMap::new(),
        }
    }

    /// Route messages for `session` into `outbox`.
    pub fn attach(&mut self, session: SessionId, outbox: mpsc::Sender<ServerMessage>) {
        self.outboxes.insert(session, outbox);
    }

    /// Stop routing messages to `session`.
    pub fn detach(&mut self, session: SessionId) {
        self.outboxes.remove(&session);
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }
}

/// Queue `message` without waiting. Returns `false` if the connection
/// has fallen too far behind and must be detached.
fn deliver(
    session: SessionId,
    outbox: &mpsc::Sender<ServerMessage>,
    message: &ServerMessage,
) -> bool {
    match outbox.try_send(message.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(
                session = %session,
                event = message.name(),
                capacity = OUTBOX_CAPACITY,
                "Outbox full, dropping slow connection"
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(session = %session, event = message.name(), "Outbox closed, message dropped");
            true
        }
    }
}

impl BroadcastGateway for ChannelGateway {
    fn send_to(&mut self, session: SessionId, message: &ServerMessage) {
        let Some(outbox) = self.outboxes.get(&session) else {
            return;
        };
        if !deliver(session, outbox, message) {
            self.outboxes.remove(&session);
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        self.outboxes
            .retain(|session, outbox| deliver(*session, outbox, message));
    }
}
