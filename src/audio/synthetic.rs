use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::CaptureError;

use super::capture::{CaptureSession, DeviceInfo};
use super::stimulus::OutputBuffer;

/// Device id of the simulated microphone
pub const SYNTHETIC_INPUT_ID: usize = 0;
/// Device id of the simulated speaker array
pub const SYNTHETIC_OUTPUT_ID: usize = 1;

/// Deterministic loopback used for tests and CLI tooling.
///
/// Each output channel reaches the "microphone" scaled by its own linear
/// gain, so a channel with gain 0.5 measures about 6 dB quieter than one
/// with gain 1.0. No audio hardware is touched.
pub struct SyntheticCaptureSession {
    channel_gains: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
    failing_channels: HashSet<usize>,
    devices_available: bool,
    captures: AtomicUsize,
}

impl SyntheticCaptureSession {
    /// Loopback with `channel_count` channels at unity gain
    pub fn new(channel_count: usize, sample_rate: u32) -> Self {
        Self {
            channel_gains: vec![1.0; channel_count],
            input_rate: sample_rate,
            output_rate: sample_rate,
            failing_channels: HashSet::new(),
            devices_available: true,
            captures: AtomicUsize::new(0),
        }
    }

    /// Per-channel linear gains; the channel count follows the gain list
    pub fn with_gains(mut self, gains: Vec<f32>) -> Self {
        self.channel_gains = gains;
        self
    }

    /// Report a different native rate for the microphone
    pub fn with_input_rate(mut self, input_rate: u32) -> Self {
        self.input_rate = input_rate;
        self
    }

    /// Make captures that drive `channel` fail with a stream error
    pub fn with_failing_channel(mut self, channel: usize) -> Self {
        self.failing_channels.insert(channel);
        self
    }

    /// Simulate a host with no reachable devices
    pub fn without_devices(mut self) -> Self {
        self.devices_available = false;
        self
    }

    /// Number of completed play-and-record calls
    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    fn gain(&self, channel: usize) -> f32 {
        self.channel_gains.get(channel).copied().unwrap_or(0.0)
    }
}

impl CaptureSession for SyntheticCaptureSession {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        if !self.devices_available {
            return Err(CaptureError::DeviceError {
                details: "synthetic host has no devices".to_string(),
            });
        }

        Ok(vec![
            DeviceInfo {
                id: SYNTHETIC_INPUT_ID,
                name: "Synthetic Microphone".to_string(),
                max_input_channels: 1,
                max_output_channels: 0,
                default_sample_rate: self.input_rate,
            },
            DeviceInfo {
                id: SYNTHETIC_OUTPUT_ID,
                name: "Synthetic Speakers".to_string(),
                max_input_channels: 0,
                max_output_channels: self.channel_gains.len(),
                default_sample_rate: self.output_rate,
            },
        ])
    }

    fn play_and_record(
        &self,
        output: &OutputBuffer,
        sample_rate: u32,
        input_device: usize,
        output_device: usize,
    ) -> Result<Vec<f32>, CaptureError> {
        let input = self.device(input_device)?;
        let out = self.device(output_device)?;
        if input.default_sample_rate != out.default_sample_rate {
            return Err(CaptureError::SampleRateMismatch {
                input_rate: input.default_sample_rate,
                output_rate: out.default_sample_rate,
            });
        }
        if sample_rate != out.default_sample_rate {
            return Err(CaptureError::StreamOpenFailed {
                reason: format!(
                    "requested {} Hz but device runs at {} Hz",
                    sample_rate, out.default_sample_rate
                ),
            });
        }

        let channels = output.channels();
        if channels != out.max_output_channels {
            return Err(CaptureError::StreamOpenFailed {
                reason: format!(
                    "buffer has {} channels, device has {}",
                    channels, out.max_output_channels
                ),
            });
        }

        let driven: Vec<usize> = (0..channels)
            .filter(|&ch| output.channel(ch).iter().any(|&s| s != 0.0))
            .collect();
        if let Some(&ch) = driven.iter().find(|ch| self.failing_channels.contains(ch)) {
            return Err(CaptureError::StreamFailure {
                reason: format!("simulated dropout on channel {}", ch),
            });
        }

        let recording = output
            .as_interleaved()
            .chunks(channels)
            .map(|frame| {
                frame
                    .iter()
                    .enumerate()
                    .map(|(ch, &s)| s * self.gain(ch))
                    .sum::<f32>()
            })
            .collect();

        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(recording)
    }
}
