//! Audio decoder using symphonia
//!
//! Decodes MP3, FLAC, AAC/M4A, Vorbis and WAV to interleaved stereo f32.
//! Start offsets use decode-and-skip: always decode from the beginning and
//! discard frames before the offset. Compressed-domain seeking is not
//! sample accurate on every format.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded audio at the source sample rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved stereo f32, starting at the requested offset
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Length of the whole file, offset included
    pub total_seconds: f64,
}

pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode the file and drop everything before `start_seconds`.
    ///
    /// An offset past the end yields an empty buffer, which plays as an
    /// immediate natural finish.
    pub fn decode_from(path: &Path, start_seconds: f64) -> Result<DecodedAudio> {
        debug!("Decoding {} from {:.3}s", path.display(), start_seconds);

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let detected = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to detect format: {}", e)))?;
        let mut format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt frames are skipped, not fatal
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
            if buf.capacity() < decoded.capacity() * channels {
                *buf = SampleBuffer::new(decoded.capacity() as u64, spec);
            }
            buf.copy_interleaved_ref(decoded);
            push_stereo(buf.samples(), channels, &mut samples);
        }

        let total_frames = samples.len() / 2;
        let total_seconds = total_frames as f64 / sample_rate as f64;
        let skip_frames = ((start_seconds.max(0.0) * sample_rate as f64) as usize).min(total_frames);
        samples.drain(..skip_frames * 2);

        debug!(
            "Decoded {} frames at {}Hz, skipped {}",
            total_frames, sample_rate, skip_frames
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            total_seconds,
        })
    }
}

/// Fold interleaved `channels`-wide samples into stereo.
///
/// Mono is duplicated to both sides; anything wider keeps the first two
/// channels.
fn push_stereo(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            for &s in interleaved {
                output.push(s);
                output.push(s);
            }
        }
        _ => {
            for frame in interleaved.chunks_exact(channels) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal 16-bit PCM WAV
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let data_len = frames * channels as u32 * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames * channels as u32 {
            let sample = ((i % 100) as i16) * 100;
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::File::create(path).unwrap().write_all(&bytes).unwrap();
    }

    #[test]
    fn test_push_stereo_mono_duplicates() {
        let mut out = Vec::new();
        push_stereo(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_push_stereo_drops_extra_channels() {
        let mut out = Vec::new();
        push_stereo(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_decode_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, 1, 8000);

        let decoded = SimpleDecoder::decode_from(&path, 0.0).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.samples.len(), 16000);
        assert!((decoded.total_seconds - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_skips_to_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, 2, 8000);

        let decoded = SimpleDecoder::decode_from(&path, 0.25).unwrap();
        assert_eq!(decoded.samples.len(), 6000 * 2);
        assert!((decoded.total_seconds - 1.0).abs() < 1e-6);

        let past_end = SimpleDecoder::decode_from(&path, 5.0).unwrap();
        assert!(past_end.samples.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"not audio at all").unwrap();
        assert!(matches!(SimpleDecoder::decode_from(&path, 0.0), Err(Error::Decode(_))));
    }
}
