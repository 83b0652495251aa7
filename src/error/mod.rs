// Error types for the channel calibrator
//
// This module defines custom error types for capture and calibration operations,
// providing structured error handling with error codes the UI shell can map to
// localized messages.

mod calibration;
mod capture;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the UI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Failure of a single channel test
///
/// A channel test crosses both the capture boundary and the analysis stage,
/// so its error is either kind. Neither affects other channels.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelTestError {
    Capture(CaptureError),
    Calibration(CalibrationError),
}

impl ErrorCode for ChannelTestError {
    fn code(&self) -> i32 {
        match self {
            ChannelTestError::Capture(err) => err.code(),
            ChannelTestError::Calibration(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ChannelTestError::Capture(err) => err.message(),
            ChannelTestError::Calibration(err) => err.message(),
        }
    }
}

impl fmt::Display for ChannelTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTestError::Capture(err) => err.fmt(f),
            ChannelTestError::Calibration(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ChannelTestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelTestError::Capture(err) => Some(err),
            ChannelTestError::Calibration(err) => Some(err),
        }
    }
}

impl From<CaptureError> for ChannelTestError {
    fn from(err: CaptureError) -> Self {
        ChannelTestError::Capture(err)
    }
}

impl From<CalibrationError> for ChannelTestError {
    fn from(err: CalibrationError) -> Self {
        ChannelTestError::Calibration(err)
    }
}
