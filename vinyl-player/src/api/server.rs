//! HTTP server setup and routing
//!
//! Thin surface around the playback core:
//! - `/ws` realtime control channel, `/events` read-only SSE mirror
//! - `/playback/*` snapshot, progress and command submission
//! - `/api/*` raw catalog and front-end config files
//! - `/static/*` the front end itself

use crate::config::Config;
use crate::error::{Error, Result};
use crate::playback::{SequencerHandle, SharedCoordinator};
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
///
/// Cloning is cheap; axum hands every handler its own copy.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    /// Read access for status queries; mutations go through `sequencer`
    pub coordinator: SharedCoordinator,
    pub sequencer: Arc<SequencerHandle>,
    pub config: Arc<Config>,
}

pub fn build_router(ctx: AppContext) -> Router {
    let static_dir = ServeDir::new(ctx.config.static_dir());

    Router::new()
        .route("/", get(super::handlers::index))
        .route("/health", get(super::handlers::health))
        .route("/api/library", get(super::handlers::get_library))
        .route("/api/config", get(super::handlers::get_debug_config))
        .route("/playback/state", get(super::handlers::get_playback_state))
        .route("/playback/position", get(super::handlers::get_position))
        .route("/playback/command", post(super::handlers::post_command))
        .route("/ws", get(super::ws::ws_handler))
        .route("/events", get(super::sse::event_stream))
        .nest_service("/static", static_dir)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves.
pub async fn run<F>(ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = ctx.config.bind_addr();
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
