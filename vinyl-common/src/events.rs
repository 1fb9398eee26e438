//! Event types for the Vinyl Stack event system
//!
//! Outbound status messages double as events: the playback coordinator emits
//! them on an [`EventBus`] and every connected subscriber (WebSocket or SSE)
//! forwards them unchanged.

use crate::protocol::NavigationState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which playback source is (or would be) driven by the coordinator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// In-process decode and device output
    #[default]
    Local,
    /// Streaming-service account session
    Remote,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Local => write!(f, "local"),
            PlaybackMode::Remote => write!(f, "remote"),
        }
    }
}

/// Playback part of the `sync` message sent on connect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSync {
    pub is_playing: bool,
    /// Display title of the current (or last) track
    pub track: String,
    pub artist: String,
    /// Raw track reference, `None` when nothing is loaded
    pub track_ref: Option<String>,
    pub mode: PlaybackMode,
    pub volume: f32,
    pub cover_path: Option<String>,
}

/// Outbound message, tagged by `status`
///
/// Serialized shapes:
/// - `{"status":"sync","playback":{...},"navigation":{...}}`
/// - `{"status":"playing","track":"...","artist":"..."}`
/// - `{"status":"paused","track":"...","artist":"..."}`
/// - `{"status":"stopped"}`
/// - `{"status":"finished"}`
/// - `{"status":"volume","value":0.5}`
/// - `{"status":"error","message":"..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full state snapshot for a (re)connecting client
    Sync {
        playback: PlaybackSync,
        navigation: NavigationState,
    },
    Playing { track: String, artist: String },
    Paused { track: String, artist: String },
    Stopped,
    /// Current track ran out on its own (not an explicit stop)
    Finished,
    Volume { value: f32 },
    /// A command failed in a way the user should hear about
    Error { message: String },
}

impl ServerMessage {
    /// Status string, also used as the SSE event name
    pub fn status(&self) -> &'static str {
        match self {
            ServerMessage::Sync { .. } => "sync",
            ServerMessage::Playing { .. } => "playing",
            ServerMessage::Paused { .. } => "paused",
            ServerMessage::Stopped => "stopped",
            ServerMessage::Finished => "finished",
            ServerMessage::Volume { .. } => "volume",
            ServerMessage::Error { .. } => "error",
        }
    }
}

/// One-to-many broadcast of [`ServerMessage`]s
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and lose
/// the oldest messages rather than blocking the emitter.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerMessage>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ServerMessage) {
        let _ = self.tx.send(event);
    }
}
