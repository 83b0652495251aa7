//! Capture boundary - synchronized play-and-record.
//!
//! The calibration core never talks to an audio host directly. It asks a
//! [`CaptureSession`] for device information and hands it one interleaved
//! output buffer per channel test, getting back a mono recording captured
//! over exactly the same time span.

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

use super::stimulus::OutputBuffer;

/// Seconds trimmed from each end of a recording to drop start/stop transients
pub const TRANSIENT_TRIM_SECONDS: f64 = 0.25;

/// Host-facing description of an audio device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable index within the session's device list
    pub id: usize,
    pub name: String,
    pub max_input_channels: usize,
    pub max_output_channels: usize,
    /// Native sample rate in Hz
    pub default_sample_rate: u32,
}

impl DeviceInfo {
    pub fn is_input(&self) -> bool {
        self.max_input_channels > 0
    }

    pub fn is_output(&self) -> bool {
        self.max_output_channels > 0
    }
}

/// Trait implemented by play-and-record backends.
///
/// `play_and_record` blocks until the whole buffer has been played and the
/// matching span recorded. Implementations must refuse to run when the two
/// devices have different native rates.
pub trait CaptureSession: Send + Sync {
    /// All devices known to the backend, inputs and outputs alike
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;

    /// Look up one device by id
    fn device(&self, id: usize) -> Result<DeviceInfo, CaptureError> {
        self.list_devices()?
            .into_iter()
            .find(|device| device.id == id)
            .ok_or_else(|| CaptureError::DeviceError {
                details: format!("no device with index {}", id),
            })
    }

    /// Play `output` on `output_device` while recording mono from `input_device`
    fn play_and_record(
        &self,
        output: &OutputBuffer,
        sample_rate: u32,
        input_device: usize,
        output_device: usize,
    ) -> Result<Vec<f32>, CaptureError>;
}

/// Input devices sorted by name, as shown in device pickers
pub fn input_devices(session: &dyn CaptureSession) -> Result<Vec<DeviceInfo>, CaptureError> {
    let mut devices: Vec<DeviceInfo> = session
        .list_devices()?
        .into_iter()
        .filter(DeviceInfo::is_input)
        .collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Output devices sorted by name, as shown in device pickers
pub fn output_devices(session: &dyn CaptureSession) -> Result<Vec<DeviceInfo>, CaptureError> {
    let mut devices: Vec<DeviceInfo> = session
        .list_devices()?
        .into_iter()
        .filter(DeviceInfo::is_output)
        .collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Resolve the shared sample rate of an input/output pair.
///
/// # Errors
/// `SampleRateMismatch` carrying both rates for display.
pub fn shared_sample_rate(
    input: &DeviceInfo,
    output: &DeviceInfo,
) -> Result<u32, CaptureError> {
    if input.default_sample_rate != output.default_sample_rate {
        return Err(CaptureError::SampleRateMismatch {
            input_rate: input.default_sample_rate,
            output_rate: output.default_sample_rate,
        });
    }
    Ok(output.default_sample_rate)
}

/// Drop the first and last [`TRANSIENT_TRIM_SECONDS`] of a recording.
///
/// Returns `None` when nothing remains.
pub fn trim_transients(recording: &[f32], sample_rate: u32) -> Option<&[f32]> {
    let trim = (TRANSIENT_TRIM_SECONDS * sample_rate as f64) as usize;
    let end = recording.len().checked_sub(trim)?;
    if end > trim {
        Some(&recording[trim..end])
    } else {
        None
    }
}
