//! Playback coordinator
//!
//! Sole owner of playback state. Holds both backends: one active and one on
//! standby. A play whose reference belongs to the other mode stops the active
//! backend first and then swaps the two, so no two backends are ever live at
//! once.
//!
//! Transport states:
//! - Idle: nothing loaded (or the last track ran out)
//! - Playing
//! - Paused
//!
//! Every change is published as a [`PlaybackSnapshot`] and acknowledged on
//! the [`EventBus`].

use crate::backend::{Backend, BackendError, BackendStatus, LocalBackend, PlaybackBackend, RemoteBackend, TrackRef};
use crate::catalog::CatalogReader;
use crate::playback::Command;
use crate::state::PlaybackSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vinyl_common::events::{EventBus, PlaybackMode, ServerMessage};
use vinyl_common::protocol::DEFAULT_VOLUME_VALUE;

/// Title used when neither the client nor the catalog has one
pub const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Idle,
    Playing,
    Paused,
}

pub struct Coordinator {
    active: Backend,
    standby: Backend,
    transport: Transport,
    current: Option<TrackRef>,
    volume: f32,
    title: String,
    artist: String,
    cover_path: Option<String>,
    catalog: Arc<dyn CatalogReader>,
    events: EventBus,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    last_finish_poll: Option<Instant>,
}

impl Coordinator {
    /// Starts in local mode, idle, at the default volume.
    pub fn new(local: LocalBackend, remote: RemoteBackend, catalog: Arc<dyn CatalogReader>, events: EventBus) -> Self {
        let (snapshot_tx, _) = watch::channel(PlaybackSnapshot::default());
        Self {
            active: Backend::Local(local),
            standby: Backend::Remote(remote),
            transport: Transport::Idle,
            current: None,
            volume: DEFAULT_VOLUME_VALUE,
            title: String::new(),
            artist: String::new(),
            cover_path: None,
            catalog,
            events,
            snapshot_tx,
            last_finish_poll: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.active.mode()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn current_track(&self) -> Option<&TrackRef> {
        self.current.as_ref()
    }

    /// Apply one queued command. Failures are reported on the event bus,
    /// never returned.
    pub fn apply(&mut self, command: Command) {
        debug!("Applying {} command", command.name());
        match command {
            Command::Play {
                track,
                start_offset_seconds,
                title,
                artist,
            } => {
                // Failure already logged and broadcast
                let _ = self.play(&track, start_offset_seconds, title, artist);
            }
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::SetVolume { level } => self.set_volume(level),
            Command::Seek { offset_seconds } => self.seek(offset_seconds),
        }
    }

    /// Load `track` on the backend its shape selects and start it.
    ///
    /// On failure the coordinator is left idle with no current track.
    pub fn play(
        &mut self,
        track: &str,
        start_offset_seconds: f64,
        title: Option<String>,
        artist: Option<String>,
    ) -> Result<(), BackendError> {
        let track_ref = TrackRef::parse(track);
        let entry = self.catalog.lookup(track);

        self.title = title
            .filter(|t| !t.is_empty())
            .or_else(|| entry.as_ref().map(|e| e.title.clone()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        self.artist = artist
            .filter(|a| !a.is_empty())
            .or_else(|| entry.as_ref().map(|e| e.artist.clone()))
            .unwrap_or_default();
        self.cover_path = entry
            .and_then(|e| e.cover_path)
            .map(|p| p.to_string_lossy().into_owned());

        self.load(track_ref, start_offset_seconds)
    }

    fn load(&mut self, track_ref: TrackRef, start_offset_seconds: f64) -> Result<(), BackendError> {
        self.active.stop();

        let mode = track_ref.mode();
        if mode != self.active.mode() {
            std::mem::swap(&mut self.active, &mut self.standby);
            info!("Playback mode switched to {}", mode);
        }

        match self.active.load_and_play(&track_ref, start_offset_seconds) {
            Ok(()) => {
                info!("Playing {} from {:.1}s", track_ref, start_offset_seconds);
                self.transport = Transport::Playing;
                self.current = Some(track_ref);
                self.emit(ServerMessage::Playing {
                    track: self.title.clone(),
                    artist: self.artist.clone(),
                });
                self.publish();
                Ok(())
            }
            Err(e) => {
                warn!("Play of {} failed: {}", track_ref, e);
                self.transport = Transport::Idle;
                self.current = None;
                self.title.clear();
                self.artist.clear();
                self.cover_path = None;
                self.emit(ServerMessage::Error { message: e.to_string() });
                self.publish();
                Err(e)
            }
        }
    }

    /// Toggle between playing and paused; no-op when idle.
    ///
    /// When the backend refuses (a failed remote call) the transport stays
    /// where it was and nothing is broadcast.
    pub fn pause(&mut self) {
        match self.transport {
            Transport::Playing => {
                if !self.active.pause() {
                    warn!("Pause did not take effect, still playing");
                    return;
                }
                self.transport = Transport::Paused;
                self.emit(ServerMessage::Paused {
                    track: self.title.clone(),
                    artist: self.artist.clone(),
                });
            }
            Transport::Paused => {
                if !self.active.resume() {
                    warn!("Resume did not take effect, still paused");
                    return;
                }
                self.transport = Transport::Playing;
                self.emit(ServerMessage::Playing {
                    track: self.title.clone(),
                    artist: self.artist.clone(),
                });
            }
            Transport::Idle => {
                debug!("Pause ignored: nothing loaded");
                return;
            }
        }
        self.publish();
    }

    /// Stop playback and forget the current track; idempotent.
    pub fn stop(&mut self) {
        self.active.stop();
        self.transport = Transport::Idle;
        self.current = None;
        self.title.clear();
        self.artist.clear();
        self.cover_path = None;
        self.emit(ServerMessage::Stopped);
        self.publish();
    }

    /// Replay the current track from `offset_seconds`, keeping its mode and
    /// metadata. Ignored when no track is known.
    pub fn seek(&mut self, offset_seconds: f64) {
        let Some(track_ref) = self.current.clone() else {
            debug!("Seek ignored: no current track");
            return;
        };
        let _ = self.load(track_ref, offset_seconds.max(0.0));
    }

    /// Forwarded to the active backend whatever the transport state.
    pub fn set_volume(&mut self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        self.volume = level;
        self.active.set_volume(level);
        self.emit(ServerMessage::Volume { value: level });
        self.publish();
    }

    /// Poll the active backend for a natural end of track.
    ///
    /// On a finish the coordinator goes idle but keeps the track, so a later
    /// seek replays it.
    pub fn check_finished(&mut self) -> bool {
        if self.transport != Transport::Playing {
            return false;
        }
        if !self.active.has_finished_naturally() {
            return false;
        }
        info!("Track finished: {}", self.title);
        self.transport = Transport::Idle;
        self.emit(ServerMessage::Finished);
        self.publish();
        true
    }

    /// [`check_finished`](Self::check_finished) shared by every monitor:
    /// the backend is polled at most about once per `interval`, however many
    /// connections are watching. A skipped check reports `false`.
    pub fn check_finished_throttled(&mut self, interval: Duration) -> bool {
        let now = Instant::now();
        // Half an interval of slack absorbs tick jitter between monitors
        if self
            .last_finish_poll
            .is_some_and(|at| now.duration_since(at) < interval / 2)
        {
            return false;
        }
        self.last_finish_poll = Some(now);
        self.check_finished()
    }

    pub fn status(&mut self) -> BackendStatus {
        self.active.poll_status()
    }

    fn emit(&self, message: ServerMessage) {
        self.events.emit_lossy(message);
    }

    fn publish(&self) {
        let current = self.snapshot_tx.borrow().clone();
        let mut next = PlaybackSnapshot {
            is_playing: self.transport == Transport::Playing,
            current_track: self.current.as_ref().map(|t| t.to_string()),
            mode: self.active.mode(),
            volume: self.volume,
            title: self.title.clone(),
            artist: self.artist.clone(),
            cover_path: self.cover_path.clone(),
            revision: current.revision,
        };
        if next.same_state(&current) {
            return;
        }
        next.revision += 1;
        self.snapshot_tx.send_replace(next);
    }
}
