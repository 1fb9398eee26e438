//! Recording backends
//!
//! `FakeSink` and `FakeSession` append every call to one shared log so tests
//! can assert on cross-backend ordering (e.g. the local stop landing before a
//! remote start).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use vinyl_common::events::{EventBus, ServerMessage};
use vinyl_player::backend::{
    AudioSink, BackendError, LocalBackend, RemoteBackend, RemoteDevice, RemoteError, RemotePlayback, RemoteSession,
};
use vinyl_player::catalog::{CatalogReader, JsonCatalog};
use vinyl_player::playback::{lock_coordinator, Coordinator, SharedCoordinator};

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, call: impl Into<String>) {
    log.lock().unwrap().push(call.into());
}

/// Local output that never touches a device
#[derive(Clone)]
pub struct FakeSink {
    log: CallLog,
    busy: Arc<AtomicBool>,
}

impl FakeSink {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate the decoded audio running out
    pub fn drain(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    pub fn is_loaded(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl AudioSink for FakeSink {
    fn start(&mut self, path: &Path, start_offset_seconds: f64) -> Result<(), BackendError> {
        record(&self.log, format!("local.start {} {}", path.display(), start_offset_seconds));
        self.busy.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) {
        record(&self.log, "local.pause");
    }

    fn resume(&mut self) {
        record(&self.log, "local.resume");
    }

    fn stop(&mut self) {
        record(&self.log, "local.stop");
        self.busy.store(false, Ordering::SeqCst);
    }

    fn set_volume(&mut self, level: f32) {
        record(&self.log, format!("local.volume {}", level));
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn position_seconds(&self) -> f64 {
        0.0
    }

    fn duration_seconds(&self) -> f64 {
        if self.is_busy() {
            180.0
        } else {
            0.0
        }
    }
}

/// Streaming account with one active device by default
#[derive(Clone)]
pub struct FakeSession {
    log: CallLog,
    pub devices: Arc<Mutex<Vec<RemoteDevice>>>,
    /// What `current_playback` reports; tests overwrite it to simulate progress
    pub reading: Arc<Mutex<Option<RemotePlayback>>>,
    failing: Arc<AtomicBool>,
    polls: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            devices: Arc::new(Mutex::new(vec![RemoteDevice {
                id: "device-1".to_string(),
                name: "Living Room".to_string(),
                is_active: true,
            }])),
            reading: Arc::default(),
            failing: Arc::default(),
            polls: Arc::default(),
        }
    }

    /// Make pause/resume/seek/volume fail like a dropped connection
    pub fn fail_controls(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `current_playback` calls so far
    pub fn playback_polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn control(&self, call: impl Into<String>) -> Result<(), RemoteError> {
        record(&self.log, call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    pub fn set_reading(&self, is_playing: bool, progress_ms: u64) {
        *self.reading.lock().unwrap() = Some(RemotePlayback {
            is_playing,
            progress_ms,
            duration_ms: 240_000,
        });
    }

    pub fn clear_devices(&self) {
        self.devices.lock().unwrap().clear();
    }
}

impl RemoteSession for FakeSession {
    fn devices(&mut self) -> Result<Vec<RemoteDevice>, RemoteError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    fn start_playback(&mut self, device_id: &str, uri: &str, position_ms: u64) -> Result<(), RemoteError> {
        record(&self.log, format!("remote.play {} {} {}", device_id, uri, position_ms));
        self.set_reading(true, position_ms);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RemoteError> {
        self.control("remote.pause")
    }

    fn resume(&mut self) -> Result<(), RemoteError> {
        self.control("remote.resume")
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), RemoteError> {
        self.control(format!("remote.seek {}", position_ms))
    }

    fn set_volume(&mut self, percent: u8) -> Result<(), RemoteError> {
        self.control(format!("remote.volume {}", percent))
    }

    fn current_playback(&mut self) -> Result<Option<RemotePlayback>, RemoteError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.reading.lock().unwrap())
    }
}

/// Coordinator wired to recording fakes, with a temp folder for audio files
pub struct Rig {
    pub coordinator: SharedCoordinator,
    pub log: CallLog,
    pub sink: FakeSink,
    pub session: FakeSession,
    pub events: EventBus,
    pub dir: TempDir,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(JsonCatalog::empty()))
    }

    pub fn with_catalog(catalog: Arc<dyn CatalogReader>) -> Self {
        let log: CallLog = Arc::default();
        let sink = FakeSink::new(log.clone());
        let session = FakeSession::new(log.clone());
        let events = EventBus::new(64);

        let coordinator = Coordinator::new(
            LocalBackend::new(Box::new(sink.clone())),
            // No grace window so finish checks react immediately
            RemoteBackend::with_start_grace(Box::new(session.clone()), Duration::ZERO),
            catalog,
            events.clone(),
        );

        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            log,
            sink,
            session,
            events,
            dir: TempDir::new().unwrap(),
        }
    }

    /// Create an (empty) audio file and return its path as a track reference
    pub fn audio_file(&self, name: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        path.to_string_lossy().into_owned()
    }

    pub fn missing_file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn with_coordinator<R>(&self, f: impl FnOnce(&mut Coordinator) -> R) -> R {
        f(&mut lock_coordinator(&self.coordinator))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything currently buffered on a receiver
pub fn drain_events(rx: &mut broadcast::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}
