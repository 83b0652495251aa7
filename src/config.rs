//! Settings persistence for a calibration session
//!
//! The UI shell stores a flat JSON object between runs. Only the numeric
//! fields drive the measurement pipeline; device indices and language are
//! carried along so a session can be reproduced.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Default settings file name, relative to the working directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Default user tick list shown in the tick input field
pub const DEFAULT_FREQUENCY_TICKS: &str = "32,64,125,250,500,1000,2000,4000,8000,16000";

/// Allowed error margin range in dB
pub const ERROR_MARGIN_RANGE: (f64, f64) = (0.1, 10.0);

/// Allowed test duration range in seconds
pub const TEST_DURATION_RANGE: (f64, f64) = (1.5, 10.0);

/// Persisted session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Index into the input device list
    #[serde(default, alias = "input_device")]
    pub input_device_index: usize,
    /// Index into the output device list
    #[serde(default, alias = "output_device")]
    pub output_device_index: usize,
    /// UI language name ("English" or "Русский")
    #[serde(default = "default_language")]
    pub language: String,
    /// Allowed deviation from the average level, in dB
    #[serde(default = "default_error_margin")]
    pub error_margin: f64,
    /// Comma-separated tick frequencies in Hz
    #[serde(default = "default_frequency_ticks_input")]
    pub frequency_ticks_input: String,
    /// Show the channel response right after a single-channel test
    #[serde(default = "default_auto_show_fr")]
    pub auto_show_fr: bool,
    /// Stimulus duration in seconds
    #[serde(default = "default_test_duration")]
    pub test_duration: f64,
}

fn default_language() -> String {
    "Русский".to_string()
}

fn default_error_margin() -> f64 {
    1.0
}

fn default_frequency_ticks_input() -> String {
    DEFAULT_FREQUENCY_TICKS.to_string()
}

fn default_auto_show_fr() -> bool {
    true
}

fn default_test_duration() -> f64 {
    2.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_device_index: 0,
            output_device_index: 0,
            language: default_language(),
            error_margin: default_error_margin(),
            frequency_ticks_input: default_frequency_ticks_input(),
            auto_show_fr: default_auto_show_fr(),
            test_duration: default_test_duration(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// A missing or malformed file is not an error: defaults are returned and
    /// a warning is logged. Fields absent from the file take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    log::info!("[Settings] Loaded settings from {:?}", path.as_ref());
                    settings.sanitized()
                }
                Err(err) => {
                    log::warn!(
                        "[Settings] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Settings] Failed to read settings file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        Self::load_from_file(SETTINGS_FILE)
    }

    /// Write settings as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, json)?;
        log::info!("[Settings] Saved settings to {:?}", path.as_ref());
        Ok(())
    }

    /// Clamp numeric fields into the ranges the UI accepts
    ///
    /// Non-finite values fall back to their defaults.
    pub fn sanitized(mut self) -> Self {
        self.error_margin = clamp_or_default(
            self.error_margin,
            ERROR_MARGIN_RANGE,
            default_error_margin(),
        );
        self.test_duration = clamp_or_default(
            self.test_duration,
            TEST_DURATION_RANGE,
            default_test_duration(),
        );
        self
    }
}

fn clamp_or_default(value: f64, (min, max): (f64, f64), default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}
