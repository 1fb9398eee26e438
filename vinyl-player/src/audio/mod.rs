//! Local audio pipeline
//!
//! symphonia decode → rubato resample → cpal output, with [`DeviceSink`]
//! tying them together behind the [`crate::backend::AudioSink`] trait.

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod sink;
pub mod types;

pub use decoder::{DecodedAudio, SimpleDecoder};
pub use output::AudioOutput;
pub use resampler::Resampler;
pub use sink::DeviceSink;
pub use types::{AudioFrame, Playhead, TrackBuffer};
