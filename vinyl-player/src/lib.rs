//! # Vinyl Player Library (vinyl-player)
//!
//! Playback state coordinator for the Vinyl media-library server.
//!
//! **Purpose:** Serialize play/pause/stop/seek/volume commands from any number
//! of clients into one ordered stream, apply them to whichever backend is
//! active (local device output or a remote streaming session), detect natural
//! track ends, and broadcast every state change in real time.
//!
//! **Architecture:** axum WebSocket/SSE front → unbounded command queue →
//! single sequencer thread → coordinator → backend (symphonia + rubato + cpal,
//! or the streaming Web API over ureq)

pub mod api;
pub mod audio;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
