//! Server-Sent Events mirror
//!
//! Read-only view of every outbound message broadcast on the event bus, for
//! observers that never send commands.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events
pub async fn event_stream(State(ctx): State<AppContext>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Late subscribers start with the current state
    let initial = Event::default()
        .event("sync")
        .json_data(ctx.state.sync_message().await)
        .ok();

    let updates = BroadcastStream::new(ctx.state.subscribe_events()).filter_map(|result| async move {
        match result {
            Ok(message) => match Event::default().event(message.status()).json_data(&message) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // Lagged receiver; the client catches up on the next event
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let stream = futures::stream::iter(initial).chain(updates).map(Ok);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}
