//! Shared state
//!
//! The coordinator is the only writer of playback state. It publishes each
//! change as an immutable [`PlaybackSnapshot`] on a `watch` channel, so
//! readers never lock coordinator internals.
//!
//! Navigation state belongs to the front end and never touches a backend, so
//! connection handlers update it directly.

use serde::Serialize;
use tokio::sync::{broadcast, watch, RwLock};
use vinyl_common::events::{EventBus, PlaybackMode, PlaybackSync, ServerMessage};
use vinyl_common::protocol::{NavigationState, DEFAULT_VOLUME_VALUE};

/// Point-in-time copy of the coordinator's playback state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    /// Raw reference of the loaded track; kept after a natural finish
    pub current_track: Option<String>,
    pub mode: PlaybackMode,
    pub volume: f32,
    pub title: String,
    pub artist: String,
    pub cover_path: Option<String>,
    /// Bumped on every observable change
    pub revision: u64,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_track: None,
            mode: PlaybackMode::default(),
            volume: DEFAULT_VOLUME_VALUE,
            title: String::new(),
            artist: String::new(),
            cover_path: None,
            revision: 0,
        }
    }
}

impl PlaybackSnapshot {
    /// Equal apart from the revision counter
    pub fn same_state(&self, other: &Self) -> bool {
        Self { revision: 0, ..self.clone() } == Self { revision: 0, ..other.clone() }
    }

    pub fn to_sync(&self) -> PlaybackSync {
        PlaybackSync {
            is_playing: self.is_playing,
            track: self.title.clone(),
            artist: self.artist.clone(),
            track_ref: self.current_track.clone(),
            mode: self.mode,
            volume: self.volume,
            cover_path: self.cover_path.clone(),
        }
    }
}

/// State shared by every connection handler
pub struct SharedState {
    playback: watch::Receiver<PlaybackSnapshot>,

    /// Last navigation/UI state reported by any client
    pub navigation: RwLock<NavigationState>,

    /// Outbound broadcast to WebSocket and SSE subscribers
    pub events: EventBus,
}

impl SharedState {
    pub fn new(playback: watch::Receiver<PlaybackSnapshot>, events: EventBus) -> Self {
        Self {
            playback,
            navigation: RwLock::new(NavigationState::default()),
            events,
        }
    }

    /// Current playback snapshot
    pub fn playback(&self) -> PlaybackSnapshot {
        self.playback.borrow().clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }

    /// Full resync message for a newly connected client
    pub async fn sync_message(&self) -> ServerMessage {
        ServerMessage::Sync {
            playback: self.playback().to_sync(),
            navigation: self.navigation.read().await.clone(),
        }
    }

    /// Shallow-merge a navigation update
    pub async fn update_navigation(&self, patch: serde_json::Map<String, serde_json::Value>) {
        self.navigation.write().await.merge(patch);
    }
}
