// Spectrum module - windowed FFT magnitude spectrum of a whole recording
//
// The recording is analysed as a single frame: a Hann window spanning every
// sample, a real-input FFT, and normalization by the window sum so the
// magnitudes do not depend on how long the capture ran.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Frequency axis paired with one magnitude per bin
///
/// Both vectors always have the same length; frequencies ascend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumCurve {
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

impl SpectrumCurve {
    pub fn len(&self) -> usize {
        self.frequencies_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies_hz.is_empty()
    }

    /// Same axis, new magnitudes
    pub(crate) fn with_magnitudes(&self, magnitudes: Vec<f64>) -> Self {
        debug_assert_eq!(magnitudes.len(), self.frequencies_hz.len());
        Self {
            frequencies_hz: self.frequencies_hz.clone(),
            magnitudes,
        }
    }

    /// Frequency of the strongest bin, ignoring DC
    pub fn peak_frequency(&self) -> Option<f64> {
        self.magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies_hz[i])
    }
}

/// Symmetric Hann window of length `n` (matches `numpy.hanning`)
pub fn hann_window(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| {
                0.5 - 0.5 * ((2.0 * std::f64::consts::PI * i as f64) / (n as f64 - 1.0)).cos()
            })
            .collect(),
    }
}

/// Real-FFT bin centre frequencies `k * sample_rate / n` for `k = 0..=n/2`
pub fn rfft_frequencies(n: usize, sample_rate: u32) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let bin_width = sample_rate as f64 / n as f64;
    (0..=n / 2).map(|k| k as f64 * bin_width).collect()
}

/// Computes magnitude spectra of arbitrary-length recordings
pub struct SpectrumAnalyzer {
    planner: Mutex<FftPlanner<f64>>,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    /// Compute the window-normalized magnitude spectrum of `samples`
    ///
    /// # Returns
    /// A curve with `samples.len() / 2 + 1` bins (empty for empty input)
    pub fn compute(&self, samples: &[f32], sample_rate: u32) -> SpectrumCurve {
        let n = samples.len();
        if n == 0 {
            return SpectrumCurve {
                frequencies_hz: Vec::new(),
                magnitudes: Vec::new(),
            };
        }

        let window = hann_window(n);
        let window_sum: f64 = window.iter().sum();

        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex::new(s as f64 * w, 0.0))
            .collect();

        let fft = {
            // A poisoned planner is still a valid planner cache
            let mut planner = self
                .planner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            planner.plan_fft_forward(n)
        };
        fft.process(&mut buffer);

        // Only non-negative frequencies (real input is conjugate-symmetric)
        let magnitudes = buffer[..n / 2 + 1]
            .iter()
            .map(|c| {
                if window_sum > 0.0 {
                    c.norm() / window_sum
                } else {
                    0.0
                }
            })
            .collect();

        SpectrumCurve {
            frequencies_hz: rfft_frequencies(n, sample_rate),
            magnitudes,
        }
    }
}
