//! Remote streaming-session backend
//!
//! Every call crosses the network and may take hundreds of milliseconds or
//! fail outright. Failures outside `load_and_play` are logged and dropped;
//! they never reach the coordinator.
//!
//! Natural-finish detection is heuristic: the session must report "not
//! playing" AND zero progress. A pause alone reports nonzero progress.

use super::{BackendError, BackendStatus, PlaybackBackend, TrackRef};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Window after a start during which an idle reading is not trusted
///
/// Streaming sessions briefly report `{is_playing:false, progress_ms:0}`
/// while the new track is still buffering.
pub const DEFAULT_START_GRACE: Duration = Duration::from_secs(2);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// No credentials configured or token refresh rejected
    #[error("not connected")]
    NotConnected,

    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<RemoteError> for BackendError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotConnected => BackendError::NotConnected,
            other => BackendError::Transient(other.to_string()),
        }
    }
}

/// Playback endpoint known to the account
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDevice {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// Current session reading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RemotePlayback {
    pub is_playing: bool,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

/// Account-level playback API
pub trait RemoteSession: Send {
    fn devices(&mut self) -> Result<Vec<RemoteDevice>, RemoteError>;

    fn start_playback(&mut self, device_id: &str, uri: &str, position_ms: u64) -> Result<(), RemoteError>;

    fn pause(&mut self) -> Result<(), RemoteError>;

    fn resume(&mut self) -> Result<(), RemoteError>;

    fn seek(&mut self, position_ms: u64) -> Result<(), RemoteError>;

    fn set_volume(&mut self, percent: u8) -> Result<(), RemoteError>;

    /// `None` when nothing is playing on the account
    fn current_playback(&mut self) -> Result<Option<RemotePlayback>, RemoteError>;
}

pub struct RemoteBackend {
    session: Box<dyn RemoteSession>,
    loaded: bool,
    was_playing: bool,
    paused: bool,
    started_at: Option<Instant>,
    start_grace: Duration,
    last_status: BackendStatus,
}

impl RemoteBackend {
    pub fn new(session: Box<dyn RemoteSession>) -> Self {
        Self::with_start_grace(session, DEFAULT_START_GRACE)
    }

    pub fn with_start_grace(session: Box<dyn RemoteSession>, start_grace: Duration) -> Self {
        Self {
            session,
            loaded: false,
            was_playing: false,
            paused: false,
            started_at: None,
            start_grace,
            last_status: BackendStatus::default(),
        }
    }

    /// Active device, else the first one listed
    fn resolve_device(&mut self) -> Result<RemoteDevice, BackendError> {
        let devices = self.session.devices()?;
        devices
            .iter()
            .find(|d| d.is_active)
            .or_else(|| devices.first())
            .cloned()
            .ok_or(BackendError::NoActiveSession)
    }

    fn in_start_grace(&self) -> bool {
        self.started_at
            .is_some_and(|started| started.elapsed() < self.start_grace)
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

fn volume_percent(level: f32) -> u8 {
    (level.clamp(0.0, 1.0) * 100.0).round() as u8
}

impl PlaybackBackend for RemoteBackend {
    fn load_and_play(&mut self, track: &TrackRef, start_offset_seconds: f64) -> Result<(), BackendError> {
        let TrackRef::Remote(uri) = track else {
            return Err(BackendError::Unsupported(track.to_string()));
        };

        self.stop();

        let device = self.resolve_device().inspect_err(|e| {
            warn!("Remote play of {} has no target device: {}", uri, e);
        })?;
        debug!("Remote target device: {} ({})", device.name, device.id);

        self.session
            .start_playback(&device.id, uri, seconds_to_ms(start_offset_seconds))
            .map_err(|e| {
                warn!("Remote start_playback failed: {}", e);
                BackendError::from(e)
            })?;

        info!("Remote playback started: {} on {}", uri, device.name);
        self.loaded = true;
        self.was_playing = true;
        self.paused = false;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        self.was_playing = false;
        self.paused = false;
        self.started_at = None;
        if !std::mem::take(&mut self.loaded) {
            return;
        }
        // Sessions have no "stop"; pausing releases the account's output
        if let Err(e) = self.session.pause() {
            warn!("Remote stop failed: {}", e);
        }
    }

    fn pause(&mut self) -> bool {
        if !self.loaded {
            return false;
        }
        if self.paused {
            return true;
        }
        match self.session.pause() {
            Ok(()) => {
                self.paused = true;
                true
            }
            Err(e) => {
                warn!("Remote pause failed: {}", e);
                false
            }
        }
    }

    fn resume(&mut self) -> bool {
        if !self.loaded {
            return false;
        }
        if !self.paused {
            return true;
        }
        match self.session.resume() {
            Ok(()) => {
                self.paused = false;
                true
            }
            Err(e) => {
                warn!("Remote resume failed: {}", e);
                false
            }
        }
    }

    fn set_volume(&mut self, level: f32) {
        if let Err(e) = self.session.set_volume(volume_percent(level)) {
            warn!("Remote set_volume failed: {}", e);
        }
    }

    fn seek(&mut self, offset_seconds: f64) {
        if !self.loaded {
            return;
        }
        if let Err(e) = self.session.seek(seconds_to_ms(offset_seconds)) {
            warn!("Remote seek failed: {}", e);
        }
    }

    fn poll_status(&mut self) -> BackendStatus {
        match self.session.current_playback() {
            Ok(reading) => {
                let p = reading.unwrap_or_default();
                self.last_status = BackendStatus::new(
                    p.is_playing,
                    p.progress_ms as f64 / 1000.0,
                    p.duration_ms as f64 / 1000.0,
                );
            }
            Err(e) => warn!("Remote status poll failed, reporting last reading: {}", e),
        }
        self.last_status
    }

    fn has_finished_naturally(&mut self) -> bool {
        if !self.was_playing || self.paused || self.in_start_grace() {
            return false;
        }
        let reading = match self.session.current_playback() {
            Ok(reading) => reading.unwrap_or_default(),
            Err(e) => {
                warn!("Remote finish check failed: {}", e);
                return false;
            }
        };
        if !reading.is_playing && reading.progress_ms == 0 {
            self.was_playing = false;
            return true;
        }
        false
    }
}
