// CalibrationEngine - per-channel levels and volume suggestions
//
// Holds the latest Measurement for every tested channel and derives a verdict
// for each one relative to the average level of the non-subwoofer channels.
// Verdicts are recomputed from scratch whenever a measurement or the error
// margin changes, so they never depend on the order channels were tested in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::channels::{channel_layout, ChannelRole};

/// Default allowed deviation from the average level (dB)
pub const DEFAULT_ERROR_MARGIN_DB: f64 = 1.0;

/// Trimmed recording kept for spectral analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Result of the most recent test of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// `20 * log10(rms + 1e-10)` of the trimmed recording
    pub rms_db: f64,
    pub recording: Option<Recording>,
}

/// What the user should do with a channel's volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suggestion {
    Ok,
    IncreaseVolume,
    DecreaseVolume,
}

impl Suggestion {
    /// Classify a level difference against the allowed margin
    pub fn classify(difference_db: f64, error_margin_db: f64) -> Self {
        if difference_db.abs() <= error_margin_db {
            Suggestion::Ok
        } else if difference_db < -error_margin_db {
            Suggestion::IncreaseVolume
        } else {
            Suggestion::DecreaseVolume
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationVerdict {
    /// Channel level minus the non-subwoofer average (dB)
    pub difference_db: f64,
    pub suggestion: Suggestion,
}

/// Display state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum ChannelStatus {
    NotTested,
    /// `verdict` is `None` until a non-subwoofer channel has been measured
    Measured {
        rms_db: f64,
        verdict: Option<CalibrationVerdict>,
    },
}

/// Measurements, channel roles, and derived verdicts for one output device
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    layout: Vec<ChannelRole>,
    measurements: BTreeMap<usize, Measurement>,
    verdicts: BTreeMap<usize, CalibrationVerdict>,
    error_margin_db: f64,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CalibrationEngine {
    /// Engine for an output device with `channel_count` channels
    pub fn new(channel_count: usize) -> Self {
        Self {
            layout: channel_layout(channel_count),
            measurements: BTreeMap::new(),
            verdicts: BTreeMap::new(),
            error_margin_db: DEFAULT_ERROR_MARGIN_DB,
        }
    }

    pub fn with_error_margin(mut self, error_margin_db: f64) -> Self {
        if is_valid_margin(error_margin_db) {
            self.error_margin_db = error_margin_db;
        }
        self
    }

    pub fn channel_count(&self) -> usize {
        self.layout.len()
    }

    pub fn layout(&self) -> &[ChannelRole] {
        &self.layout
    }

    /// Role of `channel`; channels past the layout are Unknown
    pub fn role(&self, channel: usize) -> ChannelRole {
        self.layout
            .get(channel)
            .copied()
            .unwrap_or(ChannelRole::Unknown)
    }

    pub fn error_margin(&self) -> f64 {
        self.error_margin_db
    }

    /// Replace the layout for a new output device, dropping all measurements
    pub fn reset_layout(&mut self, channel_count: usize) {
        self.layout = channel_layout(channel_count);
        self.measurements.clear();
        self.verdicts.clear();
    }

    /// Store (or overwrite) the measurement of `channel` and refresh verdicts
    pub fn record(&mut self, channel: usize, rms_db: f64, recording: Option<Recording>) {
        debug_assert!(rms_db.is_finite());
        self.measurements
            .insert(channel, Measurement { rms_db, recording });
        self.recompute_verdicts();
    }

    /// Replace the error margin and refresh verdicts
    ///
    /// Negative or non-finite margins are ignored and the current one kept.
    pub fn set_error_margin(&mut self, error_margin_db: f64) {
        if !is_valid_margin(error_margin_db) {
            log::warn!(
                "[CalibrationEngine] Ignoring invalid error margin {}",
                error_margin_db
            );
            return;
        }
        self.error_margin_db = error_margin_db;
        self.recompute_verdicts();
    }

    /// Recompute every verdict from the stored measurements
    ///
    /// The subwoofer is left out of the average but still gets a verdict.
    /// Without any non-subwoofer measurement the previous verdicts stay.
    pub fn recompute_verdicts(&mut self) {
        let reference: Vec<f64> = self
            .measurements
            .iter()
            .filter(|(&channel, _)| !self.role(channel).is_subwoofer())
            .map(|(_, m)| m.rms_db)
            .collect();

        if reference.is_empty() {
            return;
        }
        let average = reference.iter().sum::<f64>() / reference.len() as f64;

        let margin = self.error_margin_db;
        self.verdicts = self
            .measurements
            .iter()
            .map(|(&channel, m)| {
                let difference_db = m.rms_db - average;
                (
                    channel,
                    CalibrationVerdict {
                        difference_db,
                        suggestion: Suggestion::classify(difference_db, margin),
                    },
                )
            })
            .collect();
    }

    pub fn measurement(&self, channel: usize) -> Option<&Measurement> {
        self.measurements.get(&channel)
    }

    pub fn verdict(&self, channel: usize) -> Option<CalibrationVerdict> {
        self.verdicts.get(&channel).copied()
    }

    pub fn channel_status(&self, channel: usize) -> ChannelStatus {
        match self.measurements.get(&channel) {
            Some(m) => ChannelStatus::Measured {
                rms_db: m.rms_db,
                verdict: self.verdict(channel),
            },
            None => ChannelStatus::NotTested,
        }
    }

    /// Status of every channel in the current layout
    pub fn statuses(&self) -> Vec<ChannelStatus> {
        (0..self.channel_count())
            .map(|channel| self.channel_status(channel))
            .collect()
    }

    pub fn measured_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.measurements.keys().copied()
    }

    /// Stored recordings in channel order
    pub fn recordings(&self) -> impl Iterator<Item = (usize, &Recording)> + '_ {
        self.measurements
            .iter()
            .filter_map(|(&channel, m)| m.recording.as_ref().map(|r| (channel, r)))
    }
}

fn is_valid_margin(error_margin_db: f64) -> bool {
    error_margin_db.is_finite() && error_margin_db >= 0.0
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
