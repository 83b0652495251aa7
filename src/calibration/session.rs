// CalibrationSession - entry point for a UI shell or CLI
//
// Ties the capture backend, the analysis pipeline, and the CalibrationEngine
// together. One channel test runs to completion before the next starts;
// "test all" may be cancelled between channels, never mid-capture.
//
// Shared state:
// - engine:   Arc<RwLock<CalibrationEngine>> (measurements + verdicts)
// - ticks:    RwLock<FrequencyTicks> (plot axis, replaced only on valid input)
// - settings: RwLock<Settings> (snapshot for persistence)
// Poisoned locks surface as CalibrationError::StatePoisoned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::analysis::{analyze_recording, rms_db, FrequencyResponse, FrequencyTicks, SpectrumAnalyzer};
use crate::audio::capture::{input_devices, output_devices, shared_sample_rate, trim_transients};
use crate::audio::{generate_white_noise, route_to_channel, CaptureSession, DeviceInfo};
use crate::config::Settings;
use crate::error::{
    log_calibration_error, log_capture_error, CalibrationError, CaptureError, ChannelTestError,
};

use super::channels::ChannelRole;
use super::engine::{CalibrationEngine, ChannelStatus, Recording};
use super::progress::ChannelProgress;

/// Progress channel capacity (events per "test all" run stay well below this)
const PROGRESS_CAPACITY: usize = 64;

/// Outcome of one successful channel test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReport {
    pub channel: usize,
    pub role: ChannelRole,
    pub rms_db: f64,
    /// Every channel's status after this measurement was recorded
    pub statuses: Vec<ChannelStatus>,
}

/// Result for one channel of a "test all" run
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutcome {
    pub channel: usize,
    pub result: Result<ChannelReport, ChannelTestError>,
}

#[derive(Debug, Clone)]
struct DeviceSelection {
    input: DeviceInfo,
    output: DeviceInfo,
}

pub struct CalibrationSession {
    capture: Arc<dyn CaptureSession>,
    analyzer: SpectrumAnalyzer,
    engine: Arc<RwLock<CalibrationEngine>>,
    ticks: RwLock<FrequencyTicks>,
    settings: RwLock<Settings>,
    selection: RwLock<Option<DeviceSelection>>,
    progress_tx: broadcast::Sender<ChannelProgress>,
}

impl CalibrationSession {
    /// Create a session over `capture`, seeded from `settings`
    ///
    /// An unparseable tick list in the settings falls back to the default
    /// ticks with a warning. Devices are resolved lazily on the first test.
    pub fn new(capture: Arc<dyn CaptureSession>, settings: Settings) -> Self {
        let settings = settings.sanitized();
        let ticks = match FrequencyTicks::parse(&settings.frequency_ticks_input) {
            Ok(ticks) => ticks,
            Err(err) => {
                log::warn!("[CalibrationSession] {}. Using default ticks.", err);
                FrequencyTicks::default()
            }
        };
        let engine = CalibrationEngine::default().with_error_margin(settings.error_margin);
        let (progress_tx, _) = broadcast::channel(PROGRESS_CAPACITY);

        Self {
            capture,
            analyzer: SpectrumAnalyzer::new(),
            engine: Arc::new(RwLock::new(engine)),
            ticks: RwLock::new(ticks),
            settings: RwLock::new(settings),
            selection: RwLock::new(None),
            progress_tx,
        }
    }

    /// Input devices as offered for selection
    pub fn input_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        input_devices(self.capture.as_ref())
    }

    /// Output devices as offered for selection
    pub fn output_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        output_devices(self.capture.as_ref())
    }

    /// Select devices by their position in the input/output lists
    ///
    /// Rebuilds the channel layout from the output device and clears every
    /// measurement taken on the previous device.
    ///
    /// # Returns
    /// The role of each output channel
    ///
    /// # Errors
    /// - `DeviceError` when either index is past the end of its list
    /// - `StatePoisoned` on a poisoned lock
    pub fn select_devices(
        &self,
        input_index: usize,
        output_index: usize,
    ) -> Result<Vec<ChannelRole>, ChannelTestError> {
        let input = pick(self.input_devices()?, input_index, "input")?;
        let output = pick(self.output_devices()?, output_index, "output")?;

        log::info!(
            "[CalibrationSession] Selected input {:?} and output {:?} ({} channels)",
            input.name,
            output.name,
            output.max_output_channels
        );

        let layout = {
            let mut engine = self.write_engine()?;
            engine.reset_layout(output.max_output_channels);
            engine.layout().to_vec()
        };

        *self.write_selection()? = Some(DeviceSelection { input, output });

        let mut settings = self.write_settings()?;
        settings.input_device_index = input_index;
        settings.output_device_index = output_index;

        Ok(layout)
    }

    /// Play white noise on `channel` and record the loopback
    ///
    /// Steps, in order: query the output device, check the channel exists,
    /// query the input device, check both run at the same rate, generate and
    /// route the stimulus, capture, trim 0.25 s off both ends, and record the
    /// RMS level. Any failure leaves every stored measurement untouched.
    #[tracing::instrument(skip(self))]
    pub fn test_channel(&self, channel: usize) -> Result<ChannelReport, ChannelTestError> {
        let result = self.run_channel_test(channel);
        match &result {
            Ok(report) => {
                tracing::info!(
                    "[CalibrationSession] Channel {} measured at {:.2} dB",
                    channel + 1,
                    report.rms_db
                );
                self.publish(ChannelProgress::Measured {
                    channel,
                    rms_db: report.rms_db,
                });
            }
            Err(err) => {
                match err {
                    ChannelTestError::Capture(e) => log_capture_error(e, "test_channel"),
                    ChannelTestError::Calibration(e) => log_calibration_error(e, "test_channel"),
                }
                self.publish(ChannelProgress::failed(channel, err));
            }
        }
        result
    }

    fn run_channel_test(&self, channel: usize) -> Result<ChannelReport, ChannelTestError> {
        let selection = self.ensure_selection()?;

        let output = self.capture.device(selection.output.id)?;
        let channel_count = output.max_output_channels;
        if channel >= channel_count {
            return Err(CaptureError::ChannelOutOfRange {
                channel,
                channel_count,
            }
            .into());
        }

        let input = self.capture.device(selection.input.id)?;
        let sample_rate = shared_sample_rate(&input, &output)?;

        let duration = self.read_settings()?.test_duration;
        let noise = generate_white_noise(duration, sample_rate);
        let buffer = route_to_channel(&noise, channel, channel_count)?;

        self.publish(ChannelProgress::Started { channel });
        let recording = self
            .capture
            .play_and_record(&buffer, sample_rate, input.id, output.id)?;

        let trimmed = trim_transients(&recording, sample_rate).ok_or(
            CalibrationError::InsufficientRecording {
                samples: recording.len(),
                sample_rate,
            },
        )?;
        let level = rms_db(trimmed);

        let mut engine = self.write_engine()?;
        engine.record(
            channel,
            level,
            Some(Recording {
                samples: trimmed.to_vec(),
                sample_rate,
            }),
        );

        Ok(ChannelReport {
            channel,
            role: engine.role(channel),
            rms_db: level,
            statuses: engine.statuses(),
        })
    }

    /// Test every output channel in index order
    ///
    /// A failed channel is reported and skipped. `cancel` is checked before
    /// each channel; once set, the run stops and a `Cancelled` event names
    /// the first channel left untested.
    ///
    /// # Errors
    /// Only when the devices themselves cannot be resolved; per-channel
    /// failures are returned inside the outcomes.
    pub fn test_all_channels(
        &self,
        cancel: &AtomicBool,
    ) -> Result<Vec<ChannelOutcome>, ChannelTestError> {
        let selection = self.ensure_selection()?;
        let channel_count = self.capture.device(selection.output.id)?.max_output_channels;

        let mut outcomes = Vec::with_capacity(channel_count);
        for channel in 0..channel_count {
            if cancel.load(Ordering::SeqCst) {
                log::info!(
                    "[CalibrationSession] Test run cancelled before channel {}",
                    channel + 1
                );
                self.publish(ChannelProgress::Cancelled {
                    next_channel: channel,
                });
                break;
            }
            outcomes.push(ChannelOutcome {
                channel,
                result: self.test_channel(channel),
            });
        }
        Ok(outcomes)
    }

    /// Replace the plot ticks with a parsed comma-separated list
    ///
    /// On invalid input the previous ticks stay in effect.
    pub fn apply_frequency_ticks(&self, input: &str) -> Result<FrequencyTicks, CalibrationError> {
        let ticks = FrequencyTicks::parse(input).inspect_err(|err| {
            log_calibration_error(err, "apply_frequency_ticks");
        })?;

        *self.write_ticks()? = ticks.clone();
        self.write_settings()?.frequency_ticks_input = input.to_string();
        log::info!("[CalibrationSession] Frequency ticks updated: {:?}", ticks.values());
        Ok(ticks)
    }

    pub fn frequency_ticks(&self) -> Result<FrequencyTicks, CalibrationError> {
        Ok(self.read_ticks()?.clone())
    }

    /// Change the allowed deviation and recompute every verdict
    ///
    /// The margin is clamped to the settings range; non-finite values fall
    /// back to the default. Returns the margin actually applied.
    pub fn set_error_margin(&self, error_margin_db: f64) -> Result<f64, CalibrationError> {
        let applied = {
            let mut settings = self.write_settings()?;
            settings.error_margin = error_margin_db;
            let sanitized = settings.clone().sanitized();
            *settings = sanitized;
            settings.error_margin
        };
        if applied != error_margin_db {
            log::warn!(
                "[CalibrationSession] Error margin {} out of range, using {}",
                error_margin_db,
                applied
            );
        }
        self.write_engine()?.set_error_margin(applied);
        Ok(applied)
    }

    /// Stimulus length for subsequent tests, in seconds
    pub fn set_test_duration(&self, seconds: f64) -> Result<(), CalibrationError> {
        let mut settings = self.write_settings()?;
        settings.test_duration = seconds;
        let sanitized = settings.clone().sanitized();
        *settings = sanitized;
        Ok(())
    }

    /// Frequency response of one tested channel
    ///
    /// # Errors
    /// `ChannelNotTested` when the channel has no stored recording
    pub fn channel_response(&self, channel: usize) -> Result<FrequencyResponse, CalibrationError> {
        let recording = self
            .read_engine()?
            .measurement(channel)
            .and_then(|m| m.recording.clone())
            .ok_or(CalibrationError::ChannelNotTested { channel })
            .inspect_err(|err| log_calibration_error(err, "channel_response"))?;

        let ticks = self.frequency_ticks()?;
        Ok(analyze_recording(
            &self.analyzer,
            &recording.samples,
            recording.sample_rate,
            &ticks,
        ))
    }

    /// Frequency response of all stored recordings joined end to end
    ///
    /// Recordings are concatenated in channel order and analysed at the
    /// sample rate of the last one.
    ///
    /// # Errors
    /// `NoMeasurements` when no channel has a stored recording
    pub fn overall_response(&self) -> Result<FrequencyResponse, CalibrationError> {
        let (samples, sample_rate) = {
            let engine = self.read_engine()?;
            let mut samples = Vec::new();
            let mut sample_rate = None;
            for (_, recording) in engine.recordings() {
                samples.extend_from_slice(&recording.samples);
                sample_rate = Some(recording.sample_rate);
            }
            match sample_rate {
                Some(rate) => (samples, rate),
                None => {
                    let err = CalibrationError::NoMeasurements;
                    log_calibration_error(&err, "overall_response");
                    return Err(err);
                }
            }
        };

        let ticks = self.frequency_ticks()?;
        Ok(analyze_recording(&self.analyzer, &samples, sample_rate, &ticks))
    }

    pub fn channel_statuses(&self) -> Result<Vec<ChannelStatus>, CalibrationError> {
        Ok(self.read_engine()?.statuses())
    }

    pub fn channel_layout(&self) -> Result<Vec<ChannelRole>, CalibrationError> {
        Ok(self.read_engine()?.layout().to_vec())
    }

    /// Settings snapshot for persistence
    pub fn settings(&self) -> Result<Settings, CalibrationError> {
        Ok(self.read_settings()?.clone())
    }

    /// Shared handle to the engine, for read-only consumers
    pub fn engine(&self) -> Arc<RwLock<CalibrationEngine>> {
        Arc::clone(&self.engine)
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ChannelProgress> {
        self.progress_tx.subscribe()
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    fn publish(&self, event: ChannelProgress) {
        // No subscribers is fine
        let _ = self.progress_tx.send(event);
    }

    /// Current device pair, selecting from the settings indices if needed
    fn ensure_selection(&self) -> Result<DeviceSelection, ChannelTestError> {
        if let Some(selection) = self.read_selection()?.clone() {
            return Ok(selection);
        }

        let (input_index, output_index) = {
            let settings = self.read_settings()?;
            (settings.input_device_index, settings.output_device_index)
        };
        self.select_devices(input_index, output_index)?;

        self.read_selection()?.clone().ok_or_else(|| {
            CaptureError::DeviceError {
                details: "no devices selected".to_string(),
            }
            .into()
        })
    }

    fn read_engine(&self) -> Result<RwLockReadGuard<'_, CalibrationEngine>, CalibrationError> {
        self.engine.read().map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_engine(&self) -> Result<RwLockWriteGuard<'_, CalibrationEngine>, CalibrationError> {
        self.engine
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    fn read_ticks(&self) -> Result<RwLockReadGuard<'_, FrequencyTicks>, CalibrationError> {
        self.ticks.read().map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_ticks(&self) -> Result<RwLockWriteGuard<'_, FrequencyTicks>, CalibrationError> {
        self.ticks.write().map_err(|_| CalibrationError::StatePoisoned)
    }

    fn read_settings(&self) -> Result<RwLockReadGuard<'_, Settings>, CalibrationError> {
        self.settings
            .read()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_settings(&self) -> Result<RwLockWriteGuard<'_, Settings>, CalibrationError> {
        self.settings
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    fn read_selection(
        &self,
    ) -> Result<RwLockReadGuard<'_, Option<DeviceSelection>>, CalibrationError> {
        self.selection
            .read()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_selection(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Option<DeviceSelection>>, CalibrationError> {
        self.selection
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)
    }
}

fn pick(devices: Vec<DeviceInfo>, index: usize, kind: &str) -> Result<DeviceInfo, CaptureError> {
    let count = devices.len();
    devices
        .into_iter()
        .nth(index)
        .ok_or_else(|| CaptureError::DeviceError {
            details: format!("{} device {} not available ({} found)", kind, index, count),
        })
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
