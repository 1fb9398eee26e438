//! Playback backends
//!
//! Two interchangeable sources implement [`PlaybackBackend`]:
//! - [`LocalBackend`]: decodes files and plays them on an output device
//! - [`RemoteBackend`]: drives a streaming-service account session
//!
//! The coordinator holds them as the closed [`Backend`] enum and dispatches
//! with `match`, so a third source is a compile-time-checked addition.
//!
//! All adapter calls are blocking. They run on the sequencer thread, never
//! on the async runtime.

pub mod local;
pub mod remote;
pub mod spotify;

pub use local::{AudioSink, LocalBackend};
pub use remote::{RemoteBackend, RemoteDevice, RemoteError, RemotePlayback, RemoteSession};
pub use spotify::SpotifyClient;

use std::path::{Path, PathBuf};
use thiserror::Error;
use vinyl_common::events::PlaybackMode;

/// Remaining time below which a playing track is reported as nearly finished
pub const NEARLY_FINISHED_SECS: f64 = 1.5;

/// Failures reported by a backend adapter
///
/// Only `load_and_play` reports errors; every other adapter operation
/// degrades to a logged no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("No active playback session")]
    NoActiveSession,

    #[error("Remote session not connected")]
    NotConnected,

    #[error("Transient backend failure: {0}")]
    Transient(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Audio output error: {0}")]
    Output(String),

    /// Reference shape does not belong to this backend
    #[error("Unsupported track reference: {0}")]
    Unsupported(String),
}

/// Playable item, shape-dispatched to a playback mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackRef {
    Local(PathBuf),
    /// Streaming-service URI, e.g. `spotify:track:...`
    Remote(String),
}

impl TrackRef {
    /// Classify a raw reference string.
    ///
    /// Anything carrying a URI scheme is remote, except `file://` which is
    /// turned back into a local path. Single-letter schemes are Windows
    /// drive letters (`C:\music\a.flac`), not URIs.
    pub fn parse(raw: &str) -> Self {
        if let Some(path) = raw.strip_prefix("file://") {
            return TrackRef::Local(PathBuf::from(path));
        }
        match raw.split_once(':') {
            Some((scheme, _)) if is_uri_scheme(scheme) => TrackRef::Remote(raw.to_string()),
            _ => TrackRef::Local(PathBuf::from(raw)),
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        match self {
            TrackRef::Local(_) => PlaybackMode::Local,
            TrackRef::Remote(_) => PlaybackMode::Remote,
        }
    }

    pub fn as_local_path(&self) -> Option<&Path> {
        match self {
            TrackRef::Local(path) => Some(path),
            TrackRef::Remote(_) => None,
        }
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackRef::Local(path) => write!(f, "{}", path.display()),
            TrackRef::Remote(uri) => write!(f, "{}", uri),
        }
    }
}

fn is_uri_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && scheme.len() > 1
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Best-effort progress report
///
/// Remote readings may be stale by one network round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct BackendStatus {
    pub is_playing: bool,
    pub progress_seconds: f64,
    pub duration_seconds: f64,
    /// Under [`NEARLY_FINISHED_SECS`] left; a hint only, never a finish
    pub nearly_finished: bool,
}

impl BackendStatus {
    pub fn new(is_playing: bool, progress_seconds: f64, duration_seconds: f64) -> Self {
        let remaining = duration_seconds - progress_seconds;
        Self {
            is_playing,
            progress_seconds,
            duration_seconds,
            nearly_finished: is_playing && duration_seconds > 0.0 && remaining < NEARLY_FINISHED_SECS,
        }
    }
}

/// Uniform adapter contract over both playback sources
pub trait PlaybackBackend: Send {
    /// Stop whatever this backend is playing, load `track` and start it at
    /// `start_offset_seconds`.
    fn load_and_play(&mut self, track: &TrackRef, start_offset_seconds: f64) -> Result<(), BackendError>;

    /// Idempotent; also clears the "was playing" flag so an explicit stop is
    /// never reported as a natural finish.
    fn stop(&mut self);

    /// Returns whether the backend is now paused. `false` when nothing is
    /// loaded or the call failed, in which case nothing changed.
    fn pause(&mut self) -> bool;

    /// Returns whether the backend is now playing again.
    fn resume(&mut self) -> bool;

    /// Linear level in `[0, 1]`; applies even when nothing is loaded.
    fn set_volume(&mut self, level: f32);

    fn seek(&mut self, offset_seconds: f64);

    fn poll_status(&mut self) -> BackendStatus;

    /// True once per track end: the backend was last known playing and is
    /// now idle without an explicit stop. Reading a `true` consumes it.
    fn has_finished_naturally(&mut self) -> bool;
}

/// Closed set of backends held by the coordinator
pub enum Backend {
    Local(LocalBackend),
    Remote(RemoteBackend),
}

impl Backend {
    pub fn mode(&self) -> PlaybackMode {
        match self {
            Backend::Local(_) => PlaybackMode::Local,
            Backend::Remote(_) => PlaybackMode::Remote,
        }
    }

    fn inner(&mut self) -> &mut dyn PlaybackBackend {
        match self {
            Backend::Local(backend) => backend,
            Backend::Remote(backend) => backend,
        }
    }
}

impl PlaybackBackend for Backend {
    fn load_and_play(&mut self, track: &TrackRef, start_offset_seconds: f64) -> Result<(), BackendError> {
        self.inner().load_and_play(track, start_offset_seconds)
    }

    fn stop(&mut self) {
        self.inner().stop()
    }

    fn pause(&mut self) -> bool {
        self.inner().pause()
    }

    fn resume(&mut self) -> bool {
        self.inner().resume()
    }

    fn set_volume(&mut self, level: f32) {
        self.inner().set_volume(level)
    }

    fn seek(&mut self, offset_seconds: f64) {
        self.inner().seek(offset_seconds)
    }

    fn poll_status(&mut self) -> BackendStatus {
        self.inner().poll_status()
    }

    fn has_finished_naturally(&mut self) -> bool {
        self.inner().has_finished_naturally()
    }
}
