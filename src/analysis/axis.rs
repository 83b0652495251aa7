//! Frequency axis mapping for response plots.
//!
//! User ticks are placed at equal visual spacing: tick `i` sits at x = `i`
//! and frequencies between two ticks are interpolated linearly between
//! their positions. Dense low-frequency ticks therefore get as much room as
//! sparse high-frequency ones.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_FREQUENCY_TICKS;
use crate::error::CalibrationError;

/// Implicit first tick (Hz)
pub const AXIS_START_HZ: f64 = 0.0;

/// Implicit last tick (Hz)
pub const AXIS_END_HZ: f64 = 20000.0;

/// User-configured tick frequencies, sorted and de-duplicated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTicks {
    ticks: Vec<f64>,
}

impl Default for FrequencyTicks {
    fn default() -> Self {
        match Self::parse(DEFAULT_FREQUENCY_TICKS) {
            Ok(ticks) => ticks,
            Err(_) => Self { ticks: Vec::new() },
        }
    }
}

impl FrequencyTicks {
    /// Parse a comma-separated list such as `"32, 64, 125"`
    ///
    /// # Errors
    /// `InvalidFrequencyTicks` for empty input, any entry that is not a
    /// finite non-negative number, or an empty entry.
    pub fn parse(input: &str) -> Result<Self, CalibrationError> {
        let invalid = || CalibrationError::InvalidFrequencyTicks {
            input: input.to_string(),
        };

        if input.trim().is_empty() {
            return Err(invalid());
        }

        let mut ticks = input
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<f64>, _>>()?;

        ticks.sort_by(f64::total_cmp);
        ticks.dedup();
        Ok(Self { ticks })
    }

    /// Build from already-numeric ticks (sorted and de-duplicated here)
    pub fn from_values(values: &[f64]) -> Result<Self, CalibrationError> {
        if values.is_empty() || values.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(CalibrationError::InvalidFrequencyTicks {
                input: format!("{:?}", values),
            });
        }
        let mut ticks = values.to_vec();
        ticks.sort_by(f64::total_cmp);
        ticks.dedup();
        Ok(Self { ticks })
    }

    /// The user ticks, ascending
    pub fn values(&self) -> &[f64] {
        &self.ticks
    }

    /// Ticks bracketed by 0 Hz and 20 kHz
    ///
    /// The brackets are added even when a user tick already equals them, so
    /// degenerate (zero-width) intervals can appear at either end. Ticks
    /// above 20 kHz sort after the closing bracket.
    pub fn bracketed(&self) -> Vec<f64> {
        let mut all = Vec::with_capacity(self.ticks.len() + 2);
        all.push(AXIS_START_HZ);
        all.extend_from_slice(&self.ticks);
        all.push(AXIS_END_HZ);
        all.sort_by(f64::total_cmp);
        all
    }

    /// Comma-separated form for persistence
    pub fn to_input_string(&self) -> String {
        self.ticks
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Positions of `frequencies_hz` on this tick axis
    pub fn map(&self, frequencies_hz: &[f64]) -> Vec<f64> {
        map_frequencies(frequencies_hz, &self.bracketed())
    }
}

/// Axis labels for bracketed ticks, truncated to whole hertz
pub fn tick_labels(bracketed: &[f64]) -> Vec<String> {
    bracketed.iter().map(|f| format!("{}", f.trunc() as i64)).collect()
}

/// Map frequencies onto equally spaced tick positions
///
/// `ticks` must be ascending (duplicates allowed). A frequency in
/// `[ticks[i], ticks[i + 1])` maps to `i + (f - ticks[i]) / (ticks[i + 1] - ticks[i])`.
/// The interval index is clipped to `[0, ticks.len() - 2]`, so frequencies
/// beyond the last tick extrapolate along the final interval. A zero-width
/// interval maps to its start position.
pub fn map_frequencies(frequencies_hz: &[f64], ticks: &[f64]) -> Vec<f64> {
    if ticks.len() < 2 {
        return vec![0.0; frequencies_hz.len()];
    }
    let last_interval = ticks.len() - 2;

    frequencies_hz
        .iter()
        .map(|&f| {
            // searchsorted(side="right") - 1
            let upper = ticks.partition_point(|&t| t <= f);
            let idx = upper.saturating_sub(1).min(last_interval);

            let lo = ticks[idx];
            let hi = ticks[idx + 1];
            if hi > lo {
                idx as f64 + (f - lo) / (hi - lo)
            } else {
                idx as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKS: [f64; 4] = [0.0, 100.0, 1000.0, 20000.0];

    #[test]
    fn test_tick_boundaries_map_to_integers() {
        let x = map_frequencies(&[0.0, 100.0, 1000.0, 20000.0], &TICKS);
        assert_eq!(x, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_interpolation_inside_interval() {
        let x = map_frequencies(&[550.0, 10500.0, 50.0], &TICKS);
        assert!((x[0] - 1.5).abs() < 1e-12);
        assert!(x[1] > 2.0 && x[1] < 3.0);
        assert!((x[1] - 2.5).abs() < 1e-12);
        assert!((x[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_beyond_last_tick_extrapolates_last_interval() {
        let x = map_frequencies(&[24000.0], &TICKS);
        assert!((x[0] - (2.0 + 23000.0 / 19000.0)).abs() < 1e-12);
    }

    #[test]
    fn test_below_first_tick_uses_first_interval() {
        let x = map_frequencies(&[-50.0], &TICKS);
        assert!((x[0] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_interval_does_not_divide_by_zero() {
        let ticks = [0.0, 0.0, 1000.0, 20000.0];
        let x = map_frequencies(&[0.0, 500.0, 1000.0, 20000.0, -1.0], &ticks);
        assert!(x.iter().all(|v| v.is_finite()));
        assert_eq!(x[0], 1.0);
        assert!((x[1] - 1.5).abs() < 1e-12);
        assert_eq!(x[2], 2.0);
        assert_eq!(x[3], 3.0);
        // Clipped into the zero-width first interval
        assert_eq!(x[4], 0.0);
    }

    #[test]
    fn test_parse_sorts_and_dedups() {
        let ticks = FrequencyTicks::parse(" 1000, 100,100 ,32.5").unwrap();
        assert_eq!(ticks.values(), &[32.5, 100.0, 1000.0]);
        assert_eq!(
            ticks.bracketed(),
            vec![0.0, 32.5, 100.0, 1000.0, 20000.0]
        );
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        for input in ["", "   ", "abc", "100,abc", "100,,200", "nan", "inf", "-5", "100;200"] {
            let err = FrequencyTicks::parse(input).unwrap_err();
            assert_eq!(
                err,
                CalibrationError::InvalidFrequencyTicks {
                    input: input.to_string()
                },
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_bracketing_keeps_duplicate_edges() {
        let ticks = FrequencyTicks::parse("0,1000,20000").unwrap();
        assert_eq!(
            ticks.bracketed(),
            vec![0.0, 0.0, 1000.0, 20000.0, 20000.0]
        );
        let x = ticks.map(&[0.0, 20000.0]);
        assert!(x.iter().all(|v| v.is_finite()));
        assert_eq!(x[0], 1.0);
        assert_eq!(x[1], 3.0);
    }

    #[test]
    fn test_ticks_above_axis_end_sort_last() {
        let ticks = FrequencyTicks::parse("1000,22000").unwrap();
        assert_eq!(ticks.bracketed(), vec![0.0, 1000.0, 20000.0, 22000.0]);
    }

    #[test]
    fn test_default_ticks() {
        let ticks = FrequencyTicks::default();
        assert_eq!(ticks.values().len(), 10);
        assert_eq!(ticks.values()[0], 32.0);
        assert_eq!(ticks.bracketed().len(), 12);
    }

    #[test]
    fn test_tick_labels_and_roundtrip() {
        let ticks = FrequencyTicks::parse("31.5,1000").unwrap();
        assert_eq!(
            tick_labels(&ticks.bracketed()),
            vec!["0", "31", "1000", "20000"]
        );
        let again = FrequencyTicks::parse(&ticks.to_input_string()).unwrap();
        assert_eq!(again, ticks);
    }

    #[test]
    fn test_from_values() {
        let ticks = FrequencyTicks::from_values(&[500.0, 50.0, 500.0]).unwrap();
        assert_eq!(ticks.values(), &[50.0, 500.0]);
        assert!(FrequencyTicks::from_values(&[]).is_err());
        assert!(FrequencyTicks::from_values(&[f64::NAN]).is_err());
    }
}
