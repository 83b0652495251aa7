use super::*;
use crate::audio::synthetic::SyntheticCaptureSession;
use crate::audio::OutputBuffer;
use crate::calibration::engine::{CalibrationVerdict, Suggestion};
use crate::error::{CaptureErrorCodes, ErrorCode};
use std::sync::atomic::AtomicUsize;

const RATE: u32 = 8000;

fn session_over(capture: impl CaptureSession + 'static) -> CalibrationSession {
    let settings = Settings {
        test_duration: 1.5,
        ..Settings::default()
    };
    CalibrationSession::new(Arc::new(capture), settings)
}

fn stereo(gains: [f32; 2]) -> CalibrationSession {
    session_over(SyntheticCaptureSession::new(2, RATE).with_gains(gains.to_vec()))
}

/// Loopback whose microphone rate can be switched between tests
struct SwitchableRate {
    inner: SyntheticCaptureSession,
    mismatch: AtomicBool,
}

impl CaptureSession for SwitchableRate {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let mut devices = self.inner.list_devices()?;
        if self.mismatch.load(Ordering::SeqCst) {
            for device in devices.iter_mut().filter(|d| d.is_input()) {
                device.default_sample_rate = 44100;
            }
        }
        Ok(devices)
    }

    fn play_and_record(
        &self,
        output: &OutputBuffer,
        sample_rate: u32,
        input_device: usize,
        output_device: usize,
    ) -> Result<Vec<f32>, CaptureError> {
        self.inner
            .play_and_record(output, sample_rate, input_device, output_device)
    }
}

/// Loopback that raises the cancel flag once `after` captures completed
struct CancelAfter {
    inner: SyntheticCaptureSession,
    cancel: Arc<AtomicBool>,
    after: usize,
    done: AtomicUsize,
}

impl CaptureSession for CancelAfter {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        self.inner.list_devices()
    }

    fn play_and_record(
        &self,
        output: &OutputBuffer,
        sample_rate: u32,
        input_device: usize,
        output_device: usize,
    ) -> Result<Vec<f32>, CaptureError> {
        let recording =
            self.inner
                .play_and_record(output, sample_rate, input_device, output_device)?;
        if self.done.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.cancel.store(true, Ordering::SeqCst);
        }
        Ok(recording)
    }
}

/// Loopback returning recordings too short to survive trimming
struct ShortRecording;

impl CaptureSession for ShortRecording {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        SyntheticCaptureSession::new(2, RATE).list_devices()
    }

    fn play_and_record(
        &self,
        _output: &OutputBuffer,
        _sample_rate: u32,
        _input_device: usize,
        _output_device: usize,
    ) -> Result<Vec<f32>, CaptureError> {
        Ok(vec![0.1; 4000])
    }
}

#[test]
fn test_channel_records_noise_level() {
    let session = stereo([1.0, 1.0]);
    let report = session.test_channel(0).unwrap();

    assert_eq!(report.channel, 0);
    assert_eq!(report.role, ChannelRole::LeftFront);
    // N(0, 0.1) noise at unity gain sits near -20 dB
    assert!((report.rms_db + 20.0).abs() < 0.5, "rms {}", report.rms_db);
    assert_eq!(report.statuses.len(), 2);
    assert_eq!(report.statuses[1], ChannelStatus::NotTested);
}

#[test]
fn test_gain_difference_drives_suggestions() {
    let session = stereo([1.0, 0.5]);
    session.test_channel(0).unwrap();
    let report = session.test_channel(1).unwrap();

    let verdict = |status: &ChannelStatus| match status {
        ChannelStatus::Measured {
            verdict: Some(v), ..
        } => *v,
        other => panic!("no verdict in {:?}", other),
    };
    let v0 = verdict(&report.statuses[0]);
    let v1 = verdict(&report.statuses[1]);

    // Half the gain is about 6 dB down, split around the average
    assert!((v0.difference_db - 3.0).abs() < 0.5);
    assert!((v1.difference_db + 3.0).abs() < 0.5);
    assert_eq!(v0.suggestion, Suggestion::DecreaseVolume);
    assert_eq!(v1.suggestion, Suggestion::IncreaseVolume);
}

#[test]
fn test_channel_out_of_range_never_captures() {
    let session = stereo([1.0, 1.0]);
    let err = session.test_channel(5).unwrap_err();
    assert_eq!(
        err,
        ChannelTestError::Capture(CaptureError::ChannelOutOfRange {
            channel: 5,
            channel_count: 2
        })
    );
    assert!(session
        .channel_statuses()
        .unwrap()
        .iter()
        .all(|s| *s == ChannelStatus::NotTested));
}

#[test]
fn test_rate_mismatch_keeps_previous_measurement() {
    let capture = Arc::new(SwitchableRate {
        inner: SyntheticCaptureSession::new(2, RATE),
        mismatch: AtomicBool::new(false),
    });
    let session = CalibrationSession::new(
        capture.clone(),
        Settings {
            test_duration: 1.5,
            ..Settings::default()
        },
    );

    let first = session.test_channel(0).unwrap();
    capture.mismatch.store(true, Ordering::SeqCst);

    let err = session.test_channel(0).unwrap_err();
    assert_eq!(
        err,
        ChannelTestError::Capture(CaptureError::SampleRateMismatch {
            input_rate: 44100,
            output_rate: RATE
        })
    );
    assert_eq!(capture.inner.capture_count(), 1);

    let statuses = session.channel_statuses().unwrap();
    assert!(matches!(
        statuses[0],
        ChannelStatus::Measured { rms_db, .. } if rms_db == first.rms_db
    ));
}

#[test]
fn test_short_recording_is_rejected() {
    let session = session_over(ShortRecording);
    let err = session.test_channel(0).unwrap_err();
    assert_eq!(
        err,
        ChannelTestError::Calibration(CalibrationError::InsufficientRecording {
            samples: 4000,
            sample_rate: RATE
        })
    );
    assert_eq!(session.channel_statuses().unwrap()[0], ChannelStatus::NotTested);
}

#[test]
fn test_no_devices_is_reported_not_fatal() {
    let session = session_over(SyntheticCaptureSession::new(2, RATE).without_devices());
    let err = session.test_channel(0).unwrap_err();
    assert_eq!(err.code(), CaptureErrorCodes::DEVICE_ERROR);

    let cancel = AtomicBool::new(false);
    assert!(session.test_all_channels(&cancel).is_err());
}

#[test]
fn test_all_channels_skips_failures() {
    let session = session_over(SyntheticCaptureSession::new(6, RATE).with_failing_channel(2));
    let cancel = AtomicBool::new(false);

    let outcomes = session.test_all_channels(&cancel).unwrap();

    assert_eq!(outcomes.len(), 6);
    for outcome in &outcomes {
        if outcome.channel == 2 {
            assert!(matches!(
                outcome.result,
                Err(ChannelTestError::Capture(CaptureError::StreamFailure { .. }))
            ));
        } else {
            assert!(outcome.result.is_ok(), "channel {}", outcome.channel);
        }
    }

    let statuses = session.channel_statuses().unwrap();
    assert_eq!(statuses[2], ChannelStatus::NotTested);
    assert_eq!(
        statuses
            .iter()
            .filter(|s| matches!(s, ChannelStatus::Measured { .. }))
            .count(),
        5
    );
}

#[test]
fn test_all_channels_cancelled_before_start() {
    let session = stereo([1.0, 1.0]);
    let mut progress = session.subscribe_progress();
    let cancel = AtomicBool::new(true);

    let outcomes = session.test_all_channels(&cancel).unwrap();

    assert!(outcomes.is_empty());
    assert_eq!(
        progress.try_recv().unwrap(),
        ChannelProgress::Cancelled { next_channel: 0 }
    );
}

#[test]
fn test_all_channels_cancelled_between_channels() {
    let cancel = Arc::new(AtomicBool::new(false));
    let session = session_over(CancelAfter {
        inner: SyntheticCaptureSession::new(6, RATE),
        cancel: Arc::clone(&cancel),
        after: 2,
        done: AtomicUsize::new(0),
    });

    let outcomes = session.test_all_channels(&cancel).unwrap();

    // The capture in flight when the flag went up still completes
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
}

#[test]
fn test_progress_events_for_one_channel() {
    let session = stereo([1.0, 1.0]);
    let mut progress = session.subscribe_progress();

    let report = session.test_channel(1).unwrap();
    session.test_channel(9).unwrap_err();

    assert_eq!(
        progress.try_recv().unwrap(),
        ChannelProgress::Started { channel: 1 }
    );
    assert_eq!(
        progress.try_recv().unwrap(),
        ChannelProgress::Measured {
            channel: 1,
            rms_db: report.rms_db
        }
    );
    // Rejected before playback: no Started event
    assert!(matches!(
        progress.try_recv().unwrap(),
        ChannelProgress::Failed {
            channel: 9,
            code: CaptureErrorCodes::CHANNEL_OUT_OF_RANGE,
            ..
        }
    ));
}

#[test]
fn test_invalid_ticks_keep_previous() {
    let session = stereo([1.0, 1.0]);
    let applied = session.apply_frequency_ticks("100, 1000").unwrap();
    assert_eq!(applied.values(), &[100.0, 1000.0]);

    for bad in ["abc", ""] {
        let err = session.apply_frequency_ticks(bad).unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidFrequencyTicks { .. }));
    }

    assert_eq!(session.frequency_ticks().unwrap(), applied);
    assert_eq!(session.settings().unwrap().frequency_ticks_input, "100, 1000");
}

#[test]
fn test_channel_response_requires_measurement() {
    let session = stereo([1.0, 1.0]);
    assert_eq!(
        session.channel_response(1).unwrap_err(),
        CalibrationError::ChannelNotTested { channel: 1 }
    );

    session.test_channel(1).unwrap();
    session.apply_frequency_ticks("100,1000").unwrap();
    let response = session.channel_response(1).unwrap();

    // 1.5 s at 8 kHz minus 0.25 s at each end
    assert_eq!(response.len(), 8000 / 2 + 1);
    assert_eq!(response.tick_labels, vec!["0", "100", "1000", "20000"]);
    assert!(response.filtered_db.iter().all(|v| v.is_finite()));
}

#[test]
fn test_overall_response_concatenates_recordings() {
    let session = stereo([1.0, 1.0]);
    assert_eq!(
        session.overall_response().unwrap_err(),
        CalibrationError::NoMeasurements
    );

    session.test_channel(0).unwrap();
    session.test_channel(1).unwrap();
    let response = session.overall_response().unwrap();
    assert_eq!(response.len(), 16000 / 2 + 1);
}

#[test]
fn test_select_devices_resets_measurements() {
    let session = session_over(SyntheticCaptureSession::new(6, RATE));
    session.test_channel(0).unwrap();

    let layout = session.select_devices(0, 0).unwrap();
    assert_eq!(layout.len(), 6);
    assert_eq!(layout[3], ChannelRole::Subwoofer);
    assert_eq!(session.channel_statuses().unwrap()[0], ChannelStatus::NotTested);

    let err = session.select_devices(0, 4).unwrap_err();
    assert_eq!(err.code(), CaptureErrorCodes::DEVICE_ERROR);
}

#[test]
fn test_error_margin_updates_verdicts_and_settings() {
    let session = stereo([1.0, 0.5]);
    session.test_channel(0).unwrap();
    session.test_channel(1).unwrap();

    session.set_error_margin(10.0).unwrap();
    for status in session.channel_statuses().unwrap() {
        assert!(matches!(
            status,
            ChannelStatus::Measured {
                verdict: Some(CalibrationVerdict {
                    suggestion: Suggestion::Ok,
                    ..
                }),
                ..
            }
        ));
    }
    assert_eq!(session.settings().unwrap().error_margin, 10.0);
}

fn assert_verdicts_agree_with_margin(session: &CalibrationSession, margin: f64) {
    for status in session.channel_statuses().unwrap() {
        let ChannelStatus::Measured {
            verdict: Some(verdict),
            ..
        } = &status
        else {
            panic!("expected a verdict, got {:?}", status);
        };
        let expected = Suggestion::classify(verdict.difference_db, margin);
        assert_eq!(verdict.suggestion, expected);
        if verdict.difference_db > 0.0 {
            assert_ne!(verdict.suggestion, Suggestion::IncreaseVolume);
        } else {
            assert_ne!(verdict.suggestion, Suggestion::DecreaseVolume);
        }
    }
}

#[test]
fn test_out_of_range_error_margin_is_clamped() {
    let session = stereo([1.0, 1.0]);
    session.test_channel(0).unwrap();
    session.test_channel(1).unwrap();

    assert_eq!(session.set_error_margin(-1.0).unwrap(), 0.1);
    assert_eq!(session.settings().unwrap().error_margin, 0.1);
    assert_eq!(session.engine().read().unwrap().error_margin(), 0.1);
    assert_verdicts_agree_with_margin(&session, 0.1);

    assert_eq!(session.set_error_margin(f64::NAN).unwrap(), 1.0);
    assert_eq!(session.settings().unwrap().error_margin, 1.0);
    assert_eq!(session.engine().read().unwrap().error_margin(), 1.0);
    for status in session.channel_statuses().unwrap() {
        assert!(matches!(
            status,
            ChannelStatus::Measured {
                verdict: Some(CalibrationVerdict {
                    suggestion: Suggestion::Ok,
                    ..
                }),
                ..
            }
        ));
    }

    assert_eq!(session.set_error_margin(25.0).unwrap(), 10.0);
}

#[test]
fn test_test_duration_is_clamped() {
    let session = stereo([1.0, 1.0]);
    session.set_test_duration(0.1).unwrap();
    assert_eq!(session.settings().unwrap().test_duration, 1.5);
}

#[test]
fn test_poisoned_engine_lock_is_reported() {
    let session = stereo([1.0, 1.0]);
    let engine = session.engine();
    let _ = std::thread::spawn(move || {
        let _guard = engine.write().unwrap();
        panic!("poison the engine lock");
    })
    .join();

    assert_eq!(
        session.channel_statuses().unwrap_err(),
        CalibrationError::StatePoisoned
    );
    assert_eq!(
        session.test_channel(0).unwrap_err(),
        ChannelTestError::Calibration(CalibrationError::StatePoisoned)
    );
}
