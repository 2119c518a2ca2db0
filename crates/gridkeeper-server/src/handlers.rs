//! REST endpoint handlers.
//!
//! All handlers read the latest snapshot from the shared [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/state` | Current grid snapshot |
//! | `GET` | `/health` | Liveness of the coordinator task |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the grid status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();
    let energy = format!("{:.1}", snapshot.energy_level);
    let players = snapshot.player_count;
    let progress = snapshot.coop_win_progress_seconds;
    let target = snapshot.coop_win_target_seconds;
    let status = match snapshot.final_outcome_reason {
        None => String::from("RUNNING"),
        Some(reason) => format!("ENDED ({reason:?})"),
    };
    let event = snapshot
        .active_event_type
        .map_or_else(|| String::from("none"), |kind| format!("{kind:?}"));

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Gridkeeper</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Gridkeeper</h1>
    <p class="subtitle">Shared grid session server</p>

    <p>Status: <span class="status">{status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Energy</div>
            <div class="value">{energy}</div>
        </div>
        <div class="metric">
            <div class="label">Players</div>
            <div class="value">{players}</div>
        </div>
        <div class="metric">
            <div class="label">Stable</div>
            <div class="value">{progress}/{target}s</div>
        </div>
        <div class="metric">
            <div class="label">Event</div>
            <div class="value">{event}</div>
        </div>
    </div>

    <ul>
        <li>GET <a href="/api/state">/api/state</a></li>
        <li>GET <a href="/health">/health</a></li>
        <li>WS /ws</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/state -- current snapshot
// ---------------------------------------------------------------------------

/// Return the latest grid snapshot as JSON.
///
/// # Errors
///
/// Returns [`ApiError::Serialization`] if the snapshot cannot be encoded.
pub async fn get_state(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.snapshot();
    Ok(Json(serde_json::to_value(snapshot)?))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report whether the coordinator task is still running.
///
/// # Errors
///
/// Returns [`ApiError::Unavailable`] once the coordinator has stopped.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    if !state.coordinator_alive() {
        return Err(ApiError::Unavailable);
    }
    let snapshot = state.snapshot();
    Ok(Json(serde_json::json!({
        "status": "ok",
        "game_is_running": snapshot.game_is_running,
        "players": snapshot.player_count,
    })))
}
