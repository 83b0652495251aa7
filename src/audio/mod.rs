// Audio module - stimulus generation and the play-and-record boundary

pub mod capture;
pub mod engine_cpal;
pub mod stimulus;
pub mod synthetic;

// Re-export commonly used types for convenience
pub use capture::{CaptureSession, DeviceInfo, TRANSIENT_TRIM_SECONDS};
pub use engine_cpal::CpalCaptureSession;
pub use stimulus::{generate_white_noise, route_to_channel, OutputBuffer, NOISE_STD_DEV};
pub use synthetic::SyntheticCaptureSession;
