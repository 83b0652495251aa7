// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2005
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Recording has no samples left after transient trimming
    pub const INSUFFICIENT_RECORDING: i32 = 2001;

    /// Frequency tick input could not be parsed
    pub const INVALID_FREQUENCY_TICKS: i32 = 2002;

    /// Channel has no stored measurement
    pub const CHANNEL_NOT_TESTED: i32 = 2003;

    /// No channel has a stored recording
    pub const NO_MEASUREMENTS: i32 = 2004;

    /// Measurement or tick state lock was poisoned
    pub const STATE_POISONED: i32 = 2005;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover analysis of a captured recording and the state kept
/// by the calibration session.
///
/// Error code ranges: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Nothing left of the recording after trimming start/stop transients
    InsufficientRecording { samples: usize, sample_rate: u32 },

    /// Tick input was empty, non-numeric, negative, or not finite
    InvalidFrequencyTicks { input: String },

    /// Requested channel has not been measured yet
    ChannelNotTested { channel: usize },

    /// No recordings available for an overall response
    NoMeasurements,

    /// Calibration state RwLock was poisoned
    StatePoisoned,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientRecording { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_RECORDING
            }
            CalibrationError::InvalidFrequencyTicks { .. } => {
                CalibrationErrorCodes::INVALID_FREQUENCY_TICKS
            }
            CalibrationError::ChannelNotTested { .. } => CalibrationErrorCodes::CHANNEL_NOT_TESTED,
            CalibrationError::NoMeasurements => CalibrationErrorCodes::NO_MEASUREMENTS,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientRecording {
                samples,
                sample_rate,
            } => format!(
                "Recording duration too short after trimming ({} samples at {} Hz)",
                samples, sample_rate
            ),
            CalibrationError::InvalidFrequencyTicks { input } => {
                format!("Invalid frequency ticks input: {:?}", input)
            }
            CalibrationError::ChannelNotTested { channel } => {
                format!("Channel {} not tested yet", channel + 1)
            }
            CalibrationError::NoMeasurements => {
                "No data to display overall frequency response".to_string()
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
