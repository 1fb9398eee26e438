//! Local file playback backend
//!
//! Wraps an [`AudioSink`] (normally [`crate::audio::DeviceSink`]) and keeps
//! the bookkeeping needed to tell a natural track end from an explicit stop.
//!
//! Seeking is realized as stop + reload + play-from-offset. Native seek is
//! unreliable on some compressed formats; the cost is a short audible gap.

use super::{BackendError, BackendStatus, PlaybackBackend, TrackRef};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Audio output consumed by [`LocalBackend`]
pub trait AudioSink: Send {
    /// Decode `path` and start playing it from `start_offset_seconds`,
    /// replacing anything currently loaded.
    fn start(&mut self, path: &Path, start_offset_seconds: f64) -> Result<(), BackendError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Drop the loaded audio; idempotent.
    fn stop(&mut self);

    fn set_volume(&mut self, level: f32);

    /// Audio is loaded and not yet exhausted (paused counts as busy)
    fn is_busy(&self) -> bool;

    fn position_seconds(&self) -> f64;

    fn duration_seconds(&self) -> f64;
}

pub struct LocalBackend {
    sink: Box<dyn AudioSink>,
    current: Option<PathBuf>,
    was_playing: bool,
    paused: bool,
}

impl LocalBackend {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            current: None,
            was_playing: false,
            paused: false,
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl PlaybackBackend for LocalBackend {
    fn load_and_play(&mut self, track: &TrackRef, start_offset_seconds: f64) -> Result<(), BackendError> {
        let path = track
            .as_local_path()
            .ok_or_else(|| BackendError::Unsupported(track.to_string()))?;

        // Fail fast before touching the sink
        if !path.is_file() {
            warn!("Local file not found: {}", path.display());
            return Err(BackendError::FileNotFound(path.to_path_buf()));
        }

        self.stop();

        let offset = start_offset_seconds.max(0.0);
        self.sink.start(path, offset)?;

        info!("Local playback started: {} at {:.1}s", path.display(), offset);
        self.current = Some(path.to_path_buf());
        self.was_playing = true;
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.was_playing = false;
        self.paused = false;
        if self.current.take().is_some() {
            debug!("Stopping local playback");
        }
        self.sink.stop();
    }

    fn pause(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        if !self.paused {
            self.sink.pause();
            self.paused = true;
        }
        true
    }

    fn resume(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        if self.paused {
            self.sink.resume();
            self.paused = false;
        }
        true
    }

    fn set_volume(&mut self, level: f32) {
        self.sink.set_volume(level.clamp(0.0, 1.0));
    }

    fn seek(&mut self, offset_seconds: f64) {
        let Some(path) = self.current.clone() else {
            debug!("Seek ignored: nothing loaded");
            return;
        };
        if let Err(e) = self.load_and_play(&TrackRef::Local(path), offset_seconds) {
            warn!("Seek reload failed: {}", e);
        }
    }

    fn poll_status(&mut self) -> BackendStatus {
        let is_playing = self.was_playing && !self.paused && self.sink.is_busy();
        BackendStatus::new(is_playing, self.sink.position_seconds(), self.sink.duration_seconds())
    }

    fn has_finished_naturally(&mut self) -> bool {
        if self.was_playing && !self.paused && !self.sink.is_busy() {
            self.was_playing = false;
            return true;
        }
        false
    }
}
