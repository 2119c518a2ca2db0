//! `WebSocket` transport for the session protocol.
//!
//! Clients connect to `GET /ws`. Each connection is assigned a fresh
//! [`SessionId`] and becomes one session for its lifetime. Frames are JSON
//! objects of the form `{"event": <name>, "data": <payload>}`.
//!
//! The socket is split: a writer task drains the session's outbox into the
//! sink, while the handler reads inbound frames and forwards them to the
//! coordinator task. Frames that do not parse as a known inbound message
//! are dropped. A client that falls [`OUTBOX_CAPACITY`] messages behind
//! loses its outbox, which ends the writer and closes the session.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use gridkeeper_core::gateway::OUTBOX_CAPACITY;
use gridkeeper_types::{ClientMessage, ServerMessage, SessionId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Parse one inbound text frame.
///
/// Returns `None` for anything that is not a known inbound message.
pub fn parse_frame(text: &str) -> Option<ClientMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!(error = %e, "Dropping unrecognized frame");
            None
        }
    }
}

/// Encode one outbound message as a text frame body.
///
/// # Errors
///
/// Returns the underlying serialization error.
pub fn encode_frame(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Run one session from connect to disconnect.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let session = SessionId::new();
    let (outbox, mut inbox) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    if state.handle.connect(session, outbox).await.is_err() {
        warn!(session = %session, "Coordinator unavailable, closing connection");
        return;
    }
    info!(session = %session, "WebSocket session opened");

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let json = match encode_frame(&message) {
                Ok(j) => j,
                Err(e) => {
                    warn!(event = message.name(), "Failed to serialize message: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Some(message) = parse_frame(text.as_str()) else {
                            continue;
                        };
                        if state.handle.inbound(session, message).await.is_err() {
                            debug!("Coordinator gone, closing session");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(session = %session, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(session = %session, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary frames carry nothing; ping/pong is handled by axum.
                    }
                }
            }
            _ = &mut writer => {
                debug!(session = %session, "Writer finished, closing session");
                break;
            }
        }
    }

    writer.abort();
    if state.handle.disconnect(session).await.is_err() {
        debug!(session = %session, "Coordinator already stopped");
    }
    info!(session = %session, "WebSocket session closed");
}
