// Capture error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Capture error code constants
///
/// Single source of truth for the numeric codes the UI shell maps to
/// localized messages.
///
/// Error code range: 1001-1005
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// Device information unavailable or device unreachable
    pub const DEVICE_ERROR: i32 = 1001;

    /// Input and output devices run at different native sample rates
    pub const SAMPLE_RATE_MISMATCH: i32 = 1002;

    /// Requested channel does not exist on the output device
    pub const CHANNEL_OUT_OF_RANGE: i32 = 1003;

    /// Failed to open an audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1004;

    /// Audio stream failed or stalled while playing/recording
    pub const STREAM_FAILURE: i32 = 1005;
}

/// Log a capture error with structured context
///
/// Emits the numeric code, component, and message so failed channel tests
/// can be correlated in logs. Never panics.
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "Capture error in {}: code={}, component=CaptureSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised at the play-and-record boundary
///
/// All of these abort the test of a single channel and leave every stored
/// measurement untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Device info unavailable (unknown index, unplugged, host failure)
    DeviceError { details: String },

    /// Input and output devices disagree on the native sample rate
    SampleRateMismatch { input_rate: u32, output_rate: u32 },

    /// Channel index is not below the output device's channel count
    ChannelOutOfRange { channel: usize, channel_count: usize },

    /// Failed to open an input or output stream
    StreamOpenFailed { reason: String },

    /// Stream error or timeout during capture
    StreamFailure { reason: String },
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::DeviceError { .. } => CaptureErrorCodes::DEVICE_ERROR,
            CaptureError::SampleRateMismatch { .. } => CaptureErrorCodes::SAMPLE_RATE_MISMATCH,
            CaptureError::ChannelOutOfRange { .. } => CaptureErrorCodes::CHANNEL_OUT_OF_RANGE,
            CaptureError::StreamOpenFailed { .. } => CaptureErrorCodes::STREAM_OPEN_FAILED,
            CaptureError::StreamFailure { .. } => CaptureErrorCodes::STREAM_FAILURE,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::DeviceError { details } => {
                format!("Device access error: {}", details)
            }
            CaptureError::SampleRateMismatch {
                input_rate,
                output_rate,
            } => format!(
                "Sample rate mismatch between input and output devices ({} != {})",
                input_rate, output_rate
            ),
            CaptureError::ChannelOutOfRange {
                channel,
                channel_count,
            } => format!(
                "Channel {} does not exist on the selected device ({} channels)",
                channel, channel_count
            ),
            CaptureError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            CaptureError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CaptureError {}

/// Convert from std::io::Error to CaptureError
impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::DeviceError {
            details: err.to_string(),
        }
    }
}
