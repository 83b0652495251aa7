//! Stimulus - white-noise test signal generation
//!
//! The calibration stimulus is Gaussian white noise with a fixed standard
//! deviation, played on exactly one output channel while every other channel
//! stays silent.

use rand::Rng;

use crate::error::CaptureError;

/// Standard deviation of the noise stimulus (linear full-scale units)
pub const NOISE_STD_DEV: f64 = 0.1;

/// Number of samples for a stimulus of `duration_seconds` at `sample_rate`.
#[inline]
pub fn stimulus_len(duration_seconds: f64, sample_rate: u32) -> usize {
    let samples = (duration_seconds * sample_rate as f64).round();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Generates a white-noise stimulus from the thread-local RNG.
///
/// Returns exactly `round(duration_seconds * sample_rate)` samples drawn from
/// N(0, 0.1). No normalization or clipping is applied.
///
/// # Examples
/// ```
/// use channel_calibrator::audio::stimulus::generate_white_noise;
/// let noise = generate_white_noise(0.5, 48000);
/// assert_eq!(noise.len(), 24000);
/// ```
pub fn generate_white_noise(duration_seconds: f64, sample_rate: u32) -> Vec<f32> {
    generate_white_noise_with_rng(duration_seconds, sample_rate, &mut rand::thread_rng())
}

/// Generates a white-noise stimulus from the given RNG.
///
/// Use a seeded `StdRng` for reproducible output in tests.
pub fn generate_white_noise_with_rng<R: Rng + ?Sized>(
    duration_seconds: f64,
    sample_rate: u32,
    rng: &mut R,
) -> Vec<f32> {
    let num_samples = stimulus_len(duration_seconds, sample_rate);
    let mut samples = Vec::with_capacity(num_samples);

    // Box-Muller yields two independent normals per pair of uniforms
    while samples.len() < num_samples {
        let (z0, z1) = gaussian_pair(rng);
        samples.push((z0 * NOISE_STD_DEV) as f32);
        if samples.len() < num_samples {
            samples.push((z1 * NOISE_STD_DEV) as f32);
        }
    }

    samples
}

fn gaussian_pair<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    // u1 in (0, 1] keeps ln() finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (radius * theta.cos(), radius * theta.sin())
}

/// Interleaved multichannel output buffer
///
/// Frames are stored as `[frame0_ch0, frame0_ch1, ..., frame1_ch0, ...]`,
/// matching the layout audio hosts expect.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBuffer {
    samples: Vec<f32>,
    channels: usize,
}

impl OutputBuffer {
    /// Number of interleaved channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Interleaved sample data
    pub fn as_interleaved(&self) -> &[f32] {
        &self.samples
    }

    /// Copy of one channel's samples
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.samples
            .chunks(self.channels)
            .map(|frame| frame[channel])
            .collect()
    }
}

/// Place `signal` on `channel` of a `channel_count`-wide buffer, zeros elsewhere.
///
/// # Errors
/// `ChannelOutOfRange` when `channel >= channel_count`.
pub fn route_to_channel(
    signal: &[f32],
    channel: usize,
    channel_count: usize,
) -> Result<OutputBuffer, CaptureError> {
    if channel >= channel_count {
        return Err(CaptureError::ChannelOutOfRange {
            channel,
            channel_count,
        });
    }

    let mut samples = vec![0.0f32; signal.len() * channel_count];
    for (frame, &sample) in samples.chunks_mut(channel_count).zip(signal) {
        frame[channel] = sample;
    }

    Ok(OutputBuffer {
        samples,
        channels: channel_count,
    })
}
