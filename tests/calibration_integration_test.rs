//! Integration tests for the calibration workflow
//!
//! These tests drive the public API end to end over the synthetic loopback:
//! - Device selection and channel layouts
//! - Single-channel and all-channel tests with verdicts
//! - Frequency response plot data
//! - Settings persistence and progress events
//!
//! Real hardware capture (cpal) is not exercised here.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use channel_calibrator::calibration::CalibrationVerdict;
use channel_calibrator::error::CaptureErrorCodes;
use channel_calibrator::{
    CalibrationError, CalibrationSession, ChannelProgress, ChannelRole, ChannelStatus,
    ErrorCode, Localizer, Settings, StringTable, Suggestion, SyntheticCaptureSession,
};

const RATE: u32 = 8000;

fn settings() -> Settings {
    Settings {
        test_duration: 1.5,
        ..Settings::default()
    }
}

fn verdict(status: &ChannelStatus) -> Option<CalibrationVerdict> {
    match status {
        ChannelStatus::Measured { verdict, .. } => *verdict,
        ChannelStatus::NotTested => None,
    }
}

/// Test a 5.1 system where the right rear speaker is 6 dB quiet
///
/// Test steps:
/// 1. Select the synthetic devices
/// 2. Test all six channels
/// 3. Verify the quiet channel is told to increase volume
/// 4. Verify the subwoofer does not shift the reference level
#[test]
fn test_surround_system_calibration() {
    let gains = vec![1.0, 1.0, 1.0, 4.0, 1.0, 0.5];
    let capture = SyntheticCaptureSession::new(6, RATE).with_gains(gains);
    let session = CalibrationSession::new(Arc::new(capture), settings());

    let layout = session.select_devices(0, 0).unwrap();
    assert_eq!(layout[3], ChannelRole::Subwoofer);

    session.set_error_margin(2.0).unwrap();
    let outcomes = session
        .test_all_channels(&AtomicBool::new(false))
        .unwrap();
    assert_eq!(outcomes.len(), 6);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));

    let statuses = session.channel_statuses().unwrap();
    // Average of LF, RF, C, RL, RR is about -21.2 dB; the +12 dB subwoofer is ignored
    for channel in [0, 1, 2, 4] {
        assert_eq!(verdict(&statuses[channel]).unwrap().suggestion, Suggestion::Ok);
    }
    let rear_right = verdict(&statuses[5]).unwrap();
    assert_eq!(rear_right.suggestion, Suggestion::IncreaseVolume);
    assert!((rear_right.difference_db + 4.8).abs() < 0.5);

    let sub = verdict(&statuses[3]).unwrap();
    assert_eq!(sub.suggestion, Suggestion::DecreaseVolume);
    assert!((sub.difference_db - 13.2).abs() < 0.5);
}

/// A failing channel is reported while the rest of the run completes
#[test]
fn test_failed_channel_does_not_stop_run() {
    let capture = SyntheticCaptureSession::new(2, RATE).with_failing_channel(0);
    let session = CalibrationSession::new(Arc::new(capture), settings());
    let mut progress = session.subscribe_progress();

    let outcomes = session
        .test_all_channels(&AtomicBool::new(false))
        .unwrap();

    let first = outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(first.code(), CaptureErrorCodes::STREAM_FAILURE);
    assert!(outcomes[1].result.is_ok());

    let mut events = Vec::new();
    while let Ok(event) = progress.try_recv() {
        events.push(event);
    }
    assert!(matches!(events[0], ChannelProgress::Started { channel: 0 }));
    assert!(matches!(events[1], ChannelProgress::Failed { channel: 0, .. }));
    assert!(matches!(events[2], ChannelProgress::Started { channel: 1 }));
    assert!(matches!(events[3], ChannelProgress::Measured { channel: 1, .. }));
}

/// Rate mismatch between devices is refused before any capture
#[test]
fn test_sample_rate_mismatch_is_refused() {
    let capture = Arc::new(SyntheticCaptureSession::new(2, 48000).with_input_rate(44100));
    let session = CalibrationSession::new(capture.clone(), settings());

    let err = session.test_channel(0).unwrap_err();
    assert_eq!(err.code(), CaptureErrorCodes::SAMPLE_RATE_MISMATCH);
    assert_eq!(capture.capture_count(), 0);
    assert_eq!(session.channel_statuses().unwrap()[0], ChannelStatus::NotTested);

    let localizer = StringTable::for_setting("English");
    assert!(localizer.error_text(&err).contains("44100 != 48000"));
}

/// Plot data for a channel and for the whole system
#[test]
fn test_frequency_responses() {
    let session = CalibrationSession::new(
        Arc::new(SyntheticCaptureSession::new(2, RATE)),
        settings(),
    );
    session.test_channel(0).unwrap();
    session.test_channel(1).unwrap();

    let ticks = session.apply_frequency_ticks("125,1000,4000").unwrap();
    assert_eq!(ticks.bracketed(), vec![0.0, 125.0, 1000.0, 4000.0, 20000.0]);

    let channel = session.channel_response(0).unwrap();
    let overall = session.overall_response().unwrap();
    assert_eq!(channel.tick_labels, overall.tick_labels);
    assert!(overall.len() > channel.len());

    for response in [&channel, &overall] {
        assert!(response.y_min < response.y_max);
        assert!(response
            .x_positions
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
        // Nyquist is 4 kHz, so every bin lands at or before the 4000 Hz tick
        assert!(response.x_positions.iter().all(|&x| x <= 3.0 + 1e-9));
    }

    assert_eq!(
        session.apply_frequency_ticks("1000,abc").unwrap_err(),
        CalibrationError::InvalidFrequencyTicks {
            input: "1000,abc".to_string()
        }
    );
    assert_eq!(session.frequency_ticks().unwrap(), ticks);
}

/// Settings changed through the session survive a save and reload
#[test]
fn test_settings_roundtrip_through_session() {
    let path = std::env::temp_dir().join(format!(
        "channel-calibrator-session-{}.json",
        std::process::id()
    ));

    let session = CalibrationSession::new(
        Arc::new(SyntheticCaptureSession::new(2, RATE)),
        settings(),
    );
    session.set_error_margin(0.5).unwrap();
    session.apply_frequency_ticks("50,500,5000").unwrap();
    session.settings().unwrap().save_to_file(&path).unwrap();

    let reloaded = Settings::load_from_file(&path);
    assert_eq!(reloaded.error_margin, 0.5);
    assert_eq!(reloaded.frequency_ticks_input, "50,500,5000");

    let again = CalibrationSession::new(
        Arc::new(SyntheticCaptureSession::new(2, RATE)),
        reloaded,
    );
    assert_eq!(again.frequency_ticks().unwrap().values(), &[50.0, 500.0, 5000.0]);

    let _ = std::fs::remove_file(&path);
}

/// Invalid ticks stored in settings fall back to the defaults
#[test]
fn test_invalid_stored_ticks_use_defaults() {
    let session = CalibrationSession::new(
        Arc::new(SyntheticCaptureSession::new(2, RATE)),
        Settings {
            frequency_ticks_input: "not,numbers".to_string(),
            ..settings()
        },
    );
    assert_eq!(session.frequency_ticks().unwrap().values().len(), 10);
}
