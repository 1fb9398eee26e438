//! Realtime control channel
//!
//! Per connection:
//! 1. send a full `sync` snapshot so a reconnecting client can resync
//! 2. start a natural-finish monitor, aborted when the connection closes
//! 3. forward every bus message to the client while decoding its commands
//!
//! A message that does not decode is logged and dropped; the connection
//! stays open.

use crate::api::handlers::{dispatch_message, Dispatched};
use crate::api::server::AppContext;
use crate::playback::start_monitoring;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vinyl_common::events::ServerMessage;
use vinyl_common::protocol::ClientMessage;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

fn to_message(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            warn!("Failed to serialize {} message: {}", message.status(), e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the snapshot so nothing falls between them
    let mut events = ctx.state.subscribe_events();
    let connection_id = Uuid::new_v4();

    info!("Realtime client connected: {}", connection_id);

    if let Some(msg) = to_message(&ctx.state.sync_message().await) {
        if sender.send(msg).await.is_err() {
            warn!("Failed to send sync, client {} disconnected", connection_id);
            return;
        }
    }

    let _monitor = start_monitoring(ctx.coordinator.clone(), ctx.config.poll_interval);

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_text(&ctx, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by the protocol layer
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket receive error on {}: {}", connection_id, e);
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(message) => {
                        let Some(msg) = to_message(&message) else { continue };
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Realtime client {} lagged, {} messages dropped", connection_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Realtime client disconnected: {}", connection_id);
}

async fn handle_text(ctx: &AppContext, text: &str) {
    let message = match ClientMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Dropping inbound message: {}", e);
            return;
        }
    };
    match dispatch_message(ctx, message).await {
        Ok(Dispatched::Navigation) => debug!("Navigation state updated"),
        Ok(Dispatched::Queued(name)) => debug!("Queued {} command", name),
        Err(e) => warn!("Command not queued: {}", e),
    }
}
