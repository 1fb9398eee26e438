//! Core audio data types
//!
//! - [`TrackBuffer`]: a fully decoded, resampled track held in RAM
//! - [`AudioFrame`]: one stereo sample pair handed to the output device
//! - [`Playhead`]: read cursor shared between the sink and the audio callback

use std::sync::Arc;

/// Decoded track ready for playback.
///
/// Samples are interleaved stereo f32 (`[L, R, L, R, ...]`) at the output
/// device rate.
#[derive(Debug, Clone)]
pub struct TrackBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Number of stereo frames (samples.len() / 2)
    pub frame_count: usize,
}

impl TrackBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let frame_count = samples.len() / 2;
        Self {
            samples,
            sample_rate,
            frame_count,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    pub fn get_frame(&self, frame_index: usize) -> Option<AudioFrame> {
        let sample_index = frame_index * 2;
        if sample_index + 1 < self.samples.len() {
            Some(AudioFrame {
                left: self.samples[sample_index],
                right: self.samples[sample_index + 1],
            })
        } else {
            None
        }
    }
}

/// Single stereo frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    /// Silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Scale by a linear gain and clamp to [-1.0, 1.0]
    pub fn scaled(self, gain: f32) -> Self {
        AudioFrame {
            left: (self.left * gain).clamp(-1.0, 1.0),
            right: (self.right * gain).clamp(-1.0, 1.0),
        }
    }
}

/// Read cursor over the loaded track.
///
/// The audio callback calls [`Playhead::next_frame`]; the sink thread loads,
/// pauses and clears it. When the cursor runs past the end the buffer is
/// released and the playhead reports idle.
#[derive(Debug, Default)]
pub struct Playhead {
    buffer: Option<Arc<TrackBuffer>>,
    frame: usize,
    /// Track time at frame 0 of the buffer (the start offset)
    base_seconds: f64,
    /// Full track length, including the skipped lead-in
    total_seconds: f64,
    paused: bool,
    /// Last position reached, kept after the buffer drains
    last_position: f64,
}

impl Playhead {
    pub fn load(&mut self, buffer: Arc<TrackBuffer>, base_seconds: f64, total_seconds: f64) {
        self.buffer = Some(buffer);
        self.frame = 0;
        self.base_seconds = base_seconds;
        self.total_seconds = total_seconds;
        self.paused = false;
        self.last_position = base_seconds;
    }

    pub fn clear(&mut self) {
        self.buffer = None;
        self.frame = 0;
        self.paused = false;
        self.last_position = 0.0;
        self.total_seconds = 0.0;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Something is loaded and not exhausted
    pub fn is_busy(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn position_seconds(&self) -> f64 {
        match &self.buffer {
            Some(buffer) if buffer.sample_rate > 0 => {
                self.base_seconds + self.frame as f64 / buffer.sample_rate as f64
            }
            _ => self.last_position,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.total_seconds
    }

    pub fn next_frame(&mut self) -> AudioFrame {
        if self.paused {
            return AudioFrame::zero();
        }
        let Some(buffer) = &self.buffer else {
            return AudioFrame::zero();
        };
        match buffer.get_frame(self.frame) {
            Some(frame) => {
                self.frame += 1;
                frame
            }
            None => {
                self.last_position = self.position_seconds();
                self.buffer = None;
                AudioFrame::zero()
            }
        }
    }
}
