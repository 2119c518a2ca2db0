//! The coordinator task.
//!
//! A single Tokio task owns the [`SessionCoordinator`] and multiplexes the
//! tick timer, the event-check timer and inbound transport commands with
//! `tokio::select!`. Each branch runs to completion before the next is
//! polled, so the simulation needs no locks. After every step the latest
//! snapshot is published on a `watch` channel for read-only consumers.

use gridkeeper_types::{ClientMessage, ServerMessage, SessionId, StateSnapshot};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::coordinator::SessionCoordinator;
use crate::error::RuntimeError;
use crate::gateway::ChannelGateway;
use crate::timer::Ticker;

/// Capacity of the bounded command channel into the coordinator task.
pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// A transport event bound for the coordinator task.
#[derive(Debug)]
pub enum Command {
    /// A connection opened.
    Connect {
        /// Identity assigned by the transport.
        session: SessionId,
        /// Where outbound messages for this connection go.
        outbox: mpsc::Sender<ServerMessage>,
    },
    /// A connection closed.
    Disconnect {
        /// The closed connection.
        session: SessionId,
    },
    /// A parsed message arrived on a connection.
    Inbound {
        /// The sending connection.
        session: SessionId,
        /// The message.
        message: ClientMessage,
    },
}

/// Cloneable sender side of the command channel.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Announce a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CoordinatorGone`] if the task has exited.
    pub async fn connect(
        &self,
        session: SessionId,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Result<(), RuntimeError> {
        self.send(Command::Connect { session, outbox }).await
    }

    /// Announce a closed connection.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CoordinatorGone`] if the task has exited.
    pub async fn disconnect(&self, session: SessionId) -> Result<(), RuntimeError> {
        self.send(Command::Disconnect { session }).await
    }

    /// Forward an inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CoordinatorGone`] if the task has exited.
    pub async fn inbound(
        &self,
        session: SessionId,
        message: ClientMessage,
    ) -> Result<(), RuntimeError> {
        self.send(Command::Inbound { session, message }).await
    }

    async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_closed| RuntimeError::CoordinatorGone)
    }
}

/// Create the command channel.
pub fn command_channel() -> (CoordinatorHandle, mpsc::Receiver<Command>) {
    let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    (CoordinatorHandle { commands }, rx)
}

/// Drive `coordinator` until every [`CoordinatorHandle`] is dropped.
///
/// Starts the tick engine and the event scheduler, then arms and disarms
/// their timers to follow them across terminal transitions and resets.
/// Returns the coordinator so callers can inspect the final state.
pub async fn run<C: Clock>(
    mut coordinator: SessionCoordinator<ChannelGateway, C>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<StateSnapshot>,
) -> SessionCoordinator<ChannelGateway, C> {
    coordinator.start();
    let mut ticks = Ticker::new(coordinator.config().tick_interval());
    let mut checks = Ticker::new(coordinator.config().event_check_interval());
    info!("Coordinator running");

    loop {
        ticks.sync(coordinator.tick_engine().is_running());
        checks.sync(coordinator.event_scheduler().is_running());
        snapshots.send_replace(coordinator.snapshot());

        tokio::select! {
            () = ticks.tick() => {
                coordinator.on_tick();
            }
            () = checks.tick() => {
                coordinator.on_event_check();
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                apply(&mut coordinator, command);
            }
        }
    }

    info!("Command channel closed, coordinator stopping");
    coordinator
}

fn apply<C: Clock>(coordinator: &mut SessionCoordinator<ChannelGateway, C>, command: Command) {
    match command {
        Command::Connect { session, outbox } => {
            coordinator.gateway_mut().attach(session, outbox);
            coordinator.connect(session);
        }
        Command::Disconnect { session } => {
            coordinator.gateway_mut().detach(session);
            coordinator.disconnect(session);
        }
        Command::Inbound { session, message } => {
            debug!(session = %session, message = ?message, "Inbound message");
            coordinator.handle_message(session, message);
        }
    }
}
