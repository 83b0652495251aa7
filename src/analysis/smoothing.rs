// Smoothing module - post-processing of a magnitude spectrum
//
// Two independent stages, each keeping the frequency axis untouched:
// 1. Variable-width moving average whose window grows with ln(frequency),
//    a cheap stand-in for constant-Q smoothing on a linear FFT axis.
// 2. Savitzky-Golay filter (cubic, 101 bins) applied to the first stage.
//
// Both stages return absolute values: the polynomial filter overshoots below
// zero next to sharp features, and the curves are converted to dB later.

use super::polyfit::PolyGrid;
use super::spectrum::SpectrumCurve;

/// Smallest moving-average window (bins)
pub const MIN_SMOOTHING_WINDOW: usize = 3;

/// Largest moving-average window (bins)
pub const MAX_SMOOTHING_WINDOW: usize = 101;

/// Savitzky-Golay window length (bins)
pub const SAVGOL_WINDOW: usize = 101;

/// Savitzky-Golay polynomial order
pub const SAVGOL_ORDER: usize = 3;

/// Moving-average window for a bin centred at `freq_hz`
///
/// `trunc(ln(f + 1e-10) * 5)`, forced odd, clamped to `[3, 101]`.
pub fn smoothing_window(freq_hz: f64) -> usize {
    let raw = ((freq_hz + 1e-10).ln() * 5.0) as i64;
    (raw | 1).clamp(MIN_SMOOTHING_WINDOW as i64, MAX_SMOOTHING_WINDOW as i64) as usize
}

/// Variable-window log smoothing of a magnitude spectrum
///
/// Each bin becomes the mean of the bins within `window / 2` of it, with the
/// window truncated at both ends of the spectrum.
pub fn smooth_variable(curve: &SpectrumCurve) -> SpectrumCurve {
    let values = &curve.magnitudes;
    let n = values.len();

    // prefix[i] = sum of values[..i]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }

    let smoothed = curve
        .frequencies_hz
        .iter()
        .enumerate()
        .map(|(idx, &freq)| {
            let half = smoothing_window(freq) / 2;
            let start = idx.saturating_sub(half);
            let end = (idx + half + 1).min(n);
            ((prefix[end] - prefix[start]) / (end - start) as f64).abs()
        })
        .collect();

    curve.with_magnitudes(smoothed)
}

/// Window length actually used for a spectrum of `len` bins
///
/// 101, or the largest odd length that fits a shorter spectrum.
pub fn savgol_window_for(len: usize) -> usize {
    if len >= SAVGOL_WINDOW {
        SAVGOL_WINDOW
    } else if len % 2 == 1 {
        len
    } else {
        len.saturating_sub(1)
    }
}

/// Savitzky-Golay filter with polynomial-fit edges
///
/// Interior points use the centred least-squares weights; the first and last
/// `window / 2` points are evaluated on a polynomial fitted to the first and
/// last full window. `order` is lowered to `window - 1` when the window is
/// too short to support it. The result may be negative.
pub fn savgol(values: &[f64], window: usize, order: usize) -> Vec<f64> {
    let n = values.len();
    // Centred weights need an odd window
    let window = if window % 2 == 0 {
        window.saturating_sub(1)
    } else {
        window
    };
    if n == 0 || window <= 1 || window > n {
        return values.to_vec();
    }
    let order = order.min(window - 1);
    let half = window / 2;
    let grid = PolyGrid::new(window, order);

    let weights = grid.centre_weights();
    let mut out = vec![0.0; n];
    for idx in half..n - half {
        out[idx] = values[idx - half..=idx + half]
            .iter()
            .zip(&weights)
            .map(|(v, w)| v * w)
            .sum();
    }

    let head = grid.fit(&values[..window]);
    for (idx, slot) in out.iter_mut().enumerate().take(half) {
        *slot = head.eval(idx as f64);
    }

    let tail_start = n - window;
    let tail = grid.fit(&values[tail_start..]);
    for idx in n - half..n {
        out[idx] = tail.eval((idx - tail_start) as f64);
    }

    out
}

/// Savitzky-Golay stage on a spectrum (window 101, cubic), absolute-valued
pub fn savgol_filter(curve: &SpectrumCurve) -> SpectrumCurve {
    let window = savgol_window_for(curve.len());
    let filtered = savgol(&curve.magnitudes, window, SAVGOL_ORDER)
        .into_iter()
        .map(f64::abs)
        .collect();
    curve.with_magnitudes(filtered)
}

/// Raw spectrum together with both derived curves
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedSpectrum {
    pub raw: SpectrumCurve,
    pub smoothed: SpectrumCurve,
    pub filtered: SpectrumCurve,
}

/// Runs both smoothing stages in order
#[derive(Debug, Default, Clone, Copy)]
pub struct SpectrumSmoother;

impl SpectrumSmoother {
    pub fn new() -> Self {
        Self
    }

    /// Derive the smoothed curve from `raw` and the filtered curve from that
    pub fn process(&self, raw: SpectrumCurve) -> SmoothedSpectrum {
        let smoothed = smooth_variable(&raw);
        let filtered = savgol_filter(&smoothed);
        let raw = raw.with_magnitudes(raw.magnitudes.iter().map(|m| m.abs()).collect());
        SmoothedSpectrum {
            raw,
            smoothed,
            filtered,
        }
    }
}

#[cfg(test)]
#[path = "smoothing_tests.rs"]
mod tests;
