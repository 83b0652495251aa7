//! CPAL-based capture session for desktop platforms (Linux, macOS, Windows)
//!
//! Devices are enumerated from the default host in host order; a device's id
//! is its position in that list. Play-and-record opens one input and one
//! output stream at the shared native rate, feeds the first input channel
//! through a lock-free ring buffer, and blocks until the full span is
//! captured.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::CaptureError;

use super::capture::{shared_sample_rate, CaptureSession, DeviceInfo};
use super::stimulus::OutputBuffer;

/// Extra time allowed beyond the buffer duration before giving up
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

/// Poll interval of the control thread while draining the ring buffer
const DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Capture session backed by the platform's default audio host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCaptureSession;

impl CpalCaptureSession {
    pub fn new() -> Self {
        Self
    }

    fn device_handle(&self, id: usize) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.devices()
            .map_err(|e| CaptureError::DeviceError {
                details: format!("Failed to enumerate devices: {}", e),
            })?
            .nth(id)
            .ok_or_else(|| CaptureError::DeviceError {
                details: format!("no device with index {}", id),
            })
    }
}

/// Which side of a duplex device a stream is opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamSide {
    Input,
    Output,
}

/// Default rate of the requested side, falling back to the other side
fn preferred_rate(side: StreamSide, input: Option<u32>, output: Option<u32>) -> u32 {
    match side {
        StreamSide::Input => input.or(output),
        StreamSide::Output => output.or(input),
    }
    .unwrap_or(0)
}

fn default_rate(device: &cpal::Device, side: StreamSide) -> u32 {
    let input = device
        .default_input_config()
        .ok()
        .map(|config| config.sample_rate().0);
    let output = device
        .default_output_config()
        .ok()
        .map(|config| config.sample_rate().0);
    preferred_rate(side, input, output)
}

fn describe(id: usize, device: &cpal::Device, side: StreamSide) -> DeviceInfo {
    let name = device
        .name()
        .unwrap_or_else(|_| format!("Unknown device {}", id));

    let max_input_channels = device
        .supported_input_configs()
        .map(|configs| configs.map(|c| c.channels() as usize).max().unwrap_or(0))
        .unwrap_or(0);
    let max_output_channels = device
        .supported_output_configs()
        .map(|configs| configs.map(|c| c.channels() as usize).max().unwrap_or(0))
        .unwrap_or(0);

    let default_sample_rate = default_rate(device, side);

    DeviceInfo {
        id,
        name,
        max_input_channels,
        max_output_channels,
        default_sample_rate,
    }
}

impl CaptureSession for CpalCaptureSession {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let host = cpal::default_host();
        let devices = host.devices().map_err(|e| CaptureError::DeviceError {
            details: format!("Failed to enumerate devices: {}", e),
        })?;

        let infos: Vec<DeviceInfo> = devices
            .enumerate()
            .map(|(id, device)| describe(id, &device, StreamSide::Output))
            .collect();

        log::debug!(
            "[Capture] Host {:?} exposes {} devices",
            host.id(),
            infos.len()
        );
        Ok(infos)
    }

    fn play_and_record(
        &self,
        output: &OutputBuffer,
        sample_rate: u32,
        input_device: usize,
        output_device: usize,
    ) -> Result<Vec<f32>, CaptureError> {
        let input_handle = self.device_handle(input_device)?;
        let output_handle = self.device_handle(output_device)?;

        let input_info = describe(input_device, &input_handle, StreamSide::Input);
        let output_info = describe(output_device, &output_handle, StreamSide::Output);
        let native_rate = shared_sample_rate(&input_info, &output_info)?;
        if native_rate != sample_rate {
            return Err(CaptureError::StreamOpenFailed {
                reason: format!(
                    "requested {} Hz but devices run at {} Hz",
                    sample_rate, native_rate
                ),
            });
        }

        let frames = output.frames();
        let input_config = input_handle
            .default_input_config()
            .map_err(|e| CaptureError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;
        if input_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(CaptureError::StreamOpenFailed {
                reason: "Only F32 sample format is currently supported for input".to_string(),
            });
        }
        let input_stream_config = cpal::StreamConfig {
            channels: input_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let output_stream_config = cpal::StreamConfig {
            channels: output.channels() as cpal::ChannelCount,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // Room for the whole recording plus one second of callback slack
        let (mut producer, mut consumer) =
            rtrb::RingBuffer::<f32>::new(frames + sample_rate as usize);
        let input_channels = (input_stream_config.channels as usize).max(1);
        let stream_failed = Arc::new(AtomicBool::new(false));

        let input_failed = Arc::clone(&stream_failed);
        let input_stream = input_handle
            .build_input_stream(
                &input_stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // De-interleave: take first channel
                    for frame in data.chunks(input_channels) {
                        if producer.push(frame[0]).is_err() {
                            break;
                        }
                    }
                },
                move |err| {
                    log::error!("[Capture] Input stream error: {}", err);
                    input_failed.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| CaptureError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        let playback: Arc<Vec<f32>> = Arc::new(output.as_interleaved().to_vec());
        let position = Arc::new(AtomicUsize::new(0));
        let callback_playback = Arc::clone(&playback);
        let callback_position = Arc::clone(&position);
        let output_failed = Arc::clone(&stream_failed);
        let output_stream = output_handle
            .build_output_stream(
                &output_stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let start = callback_position.load(Ordering::Relaxed);
                    for (i, sample) in data.iter_mut().enumerate() {
                        *sample = callback_playback.get(start + i).copied().unwrap_or(0.0);
                    }
                    callback_position.store(start + data.len(), Ordering::Relaxed);
                },
                move |err| {
                    log::error!("[Capture] Output stream error: {}", err);
                    output_failed.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| CaptureError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        input_stream.play().map_err(|e| CaptureError::StreamFailure {
            reason: format!("Input start failed: {}", e),
        })?;
        output_stream.play().map_err(|e| CaptureError::StreamFailure {
            reason: format!("Output start failed: {}", e),
        })?;

        let deadline = Instant::now()
            + Duration::from_secs_f64(frames as f64 / sample_rate as f64)
            + CAPTURE_GRACE;
        let mut recording = Vec::with_capacity(frames);
        while recording.len() < frames {
            while let Ok(sample) = consumer.pop() {
                recording.push(sample);
                if recording.len() == frames {
                    break;
                }
            }
            if recording.len() == frames {
                break;
            }
            if stream_failed.load(Ordering::SeqCst) {
                return Err(CaptureError::StreamFailure {
                    reason: "stream reported an error during capture".to_string(),
                });
            }
            if Instant::now() > deadline {
                return Err(CaptureError::StreamFailure {
                    reason: format!(
                        "timed out after capturing {} of {} frames",
                        recording.len(),
                        frames
                    ),
                });
            }
            thread::sleep(DRAIN_INTERVAL);
        }

        drop(output_stream);
        drop(input_stream);

        log::debug!(
            "[Capture] Played {} frames on device {} and recorded {} from device {}",
            frames,
            output_device,
            recording.len(),
            input_device
        );
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_side_uses_input_rate() {
        // Duplex interface with different input and output defaults
        assert_eq!(
            preferred_rate(StreamSide::Input, Some(44100), Some(48000)),
            44100
        );
        assert_eq!(
            preferred_rate(StreamSide::Output, Some(44100), Some(48000)),
            48000
        );
    }

    #[test]
    fn test_missing_side_falls_back() {
        assert_eq!(preferred_rate(StreamSide::Input, None, Some(48000)), 48000);
        assert_eq!(preferred_rate(StreamSide::Output, Some(44100), None), 44100);
        assert_eq!(preferred_rate(StreamSide::Input, None, None), 0);
    }

    #[test]
    fn test_session_is_stateless() {
        assert_eq!(std::mem::size_of::<CpalCaptureSession>(), 0);
        let _session = CpalCaptureSession::new();
    }
}
