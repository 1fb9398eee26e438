//! Device-backed [`AudioSink`]
//!
//! The cpal stream lives on a dedicated `audio-output` thread for the life
//! of the sink. The sink itself only touches the shared [`Playhead`] and
//! volume, so it is `Send` and can sit inside the coordinator.

use crate::audio::{AudioOutput, Playhead, Resampler, SimpleDecoder, TrackBuffer};
use crate::backend::{AudioSink, BackendError};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

pub struct DeviceSink {
    playhead: Arc<Mutex<Playhead>>,
    volume: Arc<Mutex<f32>>,
    output_rate: u32,
    /// Dropping the sender releases the output thread
    shutdown_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceSink {
    /// Open the output device and start a silent stream.
    pub fn open(device_name: Option<String>, initial_volume: f32) -> Result<Self> {
        let playhead = Arc::new(Mutex::new(Playhead::default()));
        let volume = Arc::new(Mutex::new(initial_volume.clamp(0.0, 1.0)));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_playhead = Arc::clone(&playhead);
        let thread_volume = Arc::clone(&volume);
        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let opened = AudioOutput::new(device_name.as_deref(), thread_volume).and_then(|mut output| {
                    let callback_playhead = Arc::clone(&thread_playhead);
                    output.start(move || match callback_playhead.try_lock() {
                        Ok(mut head) => head.next_frame(),
                        // Sink is swapping tracks; one frame of silence
                        Err(_) => crate::audio::AudioFrame::zero(),
                    })?;
                    Ok(output)
                });
                match opened {
                    Ok(output) => {
                        let _ = ready_tx.send(Ok(output.sample_rate()));
                        // Parks until the sink is dropped
                        let _ = shutdown_rx.recv();
                        if output.has_error() {
                            warn!("Audio output closed after stream errors");
                        }
                        drop(output);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        let output_rate = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio output thread exited during startup".to_string()))??;
        info!("Audio output ready at {}Hz", output_rate);

        Ok(Self {
            playhead,
            volume,
            output_rate,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn playhead(&self) -> MutexGuard<'_, Playhead> {
        self.playhead.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prepare(&self, path: &Path, start_offset_seconds: f64) -> Result<(TrackBuffer, f64)> {
        let decoded = SimpleDecoder::decode_from(path, start_offset_seconds)?;
        let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, self.output_rate)?;
        Ok((TrackBuffer::new(samples, self.output_rate), decoded.total_seconds))
    }
}

impl AudioSink for DeviceSink {
    fn start(&mut self, path: &Path, start_offset_seconds: f64) -> std::result::Result<(), BackendError> {
        // Decode outside the playhead lock so the callback keeps running
        let (buffer, total_seconds) = self.prepare(path, start_offset_seconds).map_err(|e| match e {
            Error::AudioOutput(msg) => BackendError::Output(msg),
            other => BackendError::Decode(other.to_string()),
        })?;
        debug!(
            "Loaded {} ({:.1}s of {:.1}s)",
            path.display(),
            buffer.duration_seconds(),
            total_seconds
        );
        let base = start_offset_seconds.max(0.0).min(total_seconds);
        self.playhead().load(Arc::new(buffer), base, total_seconds);
        Ok(())
    }

    fn pause(&mut self) {
        self.playhead().set_paused(true);
    }

    fn resume(&mut self) {
        self.playhead().set_paused(false);
    }

    fn stop(&mut self) {
        self.playhead().clear();
    }

    fn set_volume(&mut self, level: f32) {
        *self.volume.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = level.clamp(0.0, 1.0);
    }

    fn is_busy(&self) -> bool {
        self.playhead().is_busy()
    }

    fn position_seconds(&self) -> f64 {
        self.playhead().position_seconds()
    }

    fn duration_seconds(&self) -> f64 {
        self.playhead().duration_seconds()
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        self.shutdown_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}
