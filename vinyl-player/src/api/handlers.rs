//! HTTP request handlers

use crate::api::server::AppContext;
use crate::backend::BackendStatus;
use crate::playback::{lock_coordinator, Command, QueueClosed};
use crate::state::PlaybackSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, error, warn};
use vinyl_common::protocol::ClientMessage;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    status: String,
    /// Command name, or `navigation` for UPDATE_NAV
    accepted: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    status: String,
    message: String,
}

fn error_response(code: StatusCode, message: impl Into<String>) -> Response {
    (
        code,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Message dispatch (shared with the WebSocket channel)
// ============================================================================

/// Where an inbound message went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Merged into navigation state
    Navigation,
    /// Enqueued for the sequencer
    Queued(&'static str),
}

/// Route a decoded client message: navigation updates apply directly,
/// playback commands go to the sequencer without waiting for them to run.
pub async fn dispatch_message(ctx: &AppContext, message: ClientMessage) -> Result<Dispatched, QueueClosed> {
    if let ClientMessage::UpdateNav(patch) = message {
        ctx.state.update_navigation(patch).await;
        return Ok(Dispatched::Navigation);
    }
    match Command::from_client_message(message) {
        Some(command) => {
            let name = command.name();
            ctx.sequencer.submit(command)?;
            Ok(Dispatched::Queued(name))
        }
        None => Ok(Dispatched::Navigation),
    }
}

// ============================================================================
// Health / Front end
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "vinyl-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET / - the front end lives under /static
pub async fn index() -> Redirect {
    Redirect::temporary("/static/index.html")
}

/// Read a JSON file, falling back to `fallback` when it is missing or invalid
async fn read_json_or(path: &Path, fallback: Value) -> Value {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("{} not readable ({}), serving fallback", path.display(), e);
            return fallback;
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Invalid JSON in {}: {}", path.display(), e);
        fallback
    })
}

/// GET /api/library - raw catalog as written by the scanner
pub async fn get_library(State(ctx): State<AppContext>) -> Json<Value> {
    Json(read_json_or(&ctx.config.library_path(), json!([])).await)
}

/// GET /api/config - front-end debug settings
pub async fn get_debug_config(State(ctx): State<AppContext>) -> Json<Value> {
    Json(read_json_or(&ctx.config.debug_config_path(), json!({})).await)
}

// ============================================================================
// Playback Endpoints
// ============================================================================

/// GET /playback/state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlaybackSnapshot> {
    Json(ctx.state.playback())
}

/// GET /playback/position
///
/// Waits behind any command currently holding the coordinator.
pub async fn get_position(State(ctx): State<AppContext>) -> Result<Json<BackendStatus>, Response> {
    let coordinator = ctx.coordinator.clone();
    tokio::task::spawn_blocking(move || lock_coordinator(&coordinator).status())
        .await
        .map(Json)
        .map_err(|e| {
            error!("Status query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "status query failed")
        })
}

/// POST /playback/command - same envelope as the WebSocket channel
pub async fn post_command(State(ctx): State<AppContext>, body: String) -> Response {
    let message = match ClientMessage::decode(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Rejected command: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match dispatch_message(&ctx, message).await {
        Ok(dispatched) => {
            let accepted = match dispatched {
                Dispatched::Navigation => "navigation",
                Dispatched::Queued(name) => name,
            };
            (
                StatusCode::ACCEPTED,
                Json(CommandResponse {
                    status: "accepted".to_string(),
                    accepted: accepted.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}
