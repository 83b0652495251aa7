// Channel Calibrator Core - speaker level matching with white noise
// Play noise per output channel, record the loopback, compare levels

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod error;
pub mod localization;

// Re-exports for convenience
pub use analysis::{FrequencyResponse, FrequencyTicks};
pub use audio::{CaptureSession, CpalCaptureSession, DeviceInfo, SyntheticCaptureSession};
pub use calibration::{
    CalibrationEngine, CalibrationSession, ChannelProgress, ChannelRole, ChannelStatus,
    Suggestion,
};
pub use config::Settings;
pub use error::{CalibrationError, CaptureError, ChannelTestError, ErrorCode};
pub use localization::{Language, Localizer, MessageKey, StringTable};
