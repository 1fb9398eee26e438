//! Sample rate conversion using rubato
//!
//! Decoded tracks are converted to whatever rate the output device runs at.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

pub struct Resampler;

impl Resampler {
    /// Resample interleaved stereo from `input_rate` to `output_rate`.
    ///
    /// Returns a copy when the rates already match.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
        if input_rate == output_rate || input.is_empty() {
            return Ok(input.to_vec());
        }
        if input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "Invalid sample rates: {} -> {}",
                input_rate, output_rate
            )));
        }

        debug!("Resampling from {}Hz to {}Hz", input_rate, output_rate);

        let planar_input = Self::deinterleave(input);
        let input_frames = planar_input[0].len();

        // One chunk spanning the whole track
        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            2,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        Ok(Self::interleave(&planar_output))
    }

    /// `[L, R, L, R, ...]` to `[[L, L, ...], [R, R, ...]]`
    fn deinterleave(samples: &[f32]) -> Vec<Vec<f32>> {
        let frames = samples.len() / 2;
        let mut planar = vec![Vec::with_capacity(frames); 2];
        for frame in samples.chunks_exact(2) {
            planar[0].push(frame[0]);
            planar[1].push(frame[1]);
        }
        planar
    }

    fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
        let [left, right] = planar else {
            return Vec::new();
        };
        left.iter().zip(right).flat_map(|(&l, &r)| [l, r]).collect()
    }
}
