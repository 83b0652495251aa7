//! Plot-ready frequency response: dB curves on the tick axis.

use serde::Serialize;

use super::axis::{tick_labels, FrequencyTicks};
use super::level::amplitude_to_db;
use super::smoothing::SmoothedSpectrum;

/// Fraction of the dB span added above and below the curves
pub const Y_MARGIN_FRACTION: f64 = 0.1;

/// Padding used when every curve is flat (zero span)
const FLAT_Y_PADDING_DB: f64 = 1.0;

/// Three response curves ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyResponse {
    /// Horizontal position of every bin on the tick axis
    pub x_positions: Vec<f64>,
    pub raw_db: Vec<f64>,
    pub smoothed_db: Vec<f64>,
    pub filtered_db: Vec<f64>,
    /// `0..ticks`, one per bracketed tick
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub y_min: f64,
    pub y_max: f64,
}

impl FrequencyResponse {
    /// Convert smoothed spectra to dB and place them on `ticks`
    pub fn from_spectrum(spectrum: &SmoothedSpectrum, ticks: &FrequencyTicks) -> Self {
        let to_db = |m: &[f64]| m.iter().map(|&v| amplitude_to_db(v)).collect::<Vec<_>>();

        let raw_db = to_db(&spectrum.raw.magnitudes);
        let smoothed_db = to_db(&spectrum.smoothed.magnitudes);
        let filtered_db = to_db(&spectrum.filtered.magnitudes);

        let bracketed = ticks.bracketed();
        let (y_min, y_max) = padded_range(raw_db.iter().chain(&smoothed_db).chain(&filtered_db));

        Self {
            x_positions: ticks.map(&spectrum.raw.frequencies_hz),
            raw_db,
            smoothed_db,
            filtered_db,
            tick_positions: (0..bracketed.len()).map(|i| i as f64).collect(),
            tick_labels: tick_labels(&bracketed),
            y_min,
            y_max,
        }
    }

    pub fn len(&self) -> usize {
        self.x_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_positions.is_empty()
    }
}

fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if lo > hi {
        return (-FLAT_Y_PADDING_DB, FLAT_Y_PADDING_DB);
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * Y_MARGIN_FRACTION
    } else {
        FLAT_Y_PADDING_DB
    };
    (lo - pad, hi + pad)
}
