// Calibration module - channel level comparison workflow
//
// Components:
// 1. channels: speaker role of each output channel
// 2. engine: measurements and per-channel verdicts
// 3. progress: events published while channels are tested
// 4. session: device selection, channel tests, and response plots
//
// The workflow:
// 1. Create a CalibrationSession over a CaptureSession backend
// 2. Test channels one at a time (or all in order)
// 3. Read verdicts and frequency responses

pub mod channels;
pub mod engine;
pub mod progress;
pub mod session;

pub use channels::{channel_layout, ChannelRole};
pub use engine::{
    CalibrationEngine, CalibrationVerdict, ChannelStatus, Measurement, Recording, Suggestion,
};
pub use progress::ChannelProgress;
pub use session::{CalibrationSession, ChannelOutcome, ChannelReport};
