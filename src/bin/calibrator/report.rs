// JSON payloads printed by the calibrator CLI

use channel_calibrator::calibration::{ChannelOutcome, ChannelReport, ChannelRole, ChannelStatus};
use channel_calibrator::error::{ChannelTestError, ErrorCode};
use channel_calibrator::{DeviceInfo, FrequencyResponse, Localizer};
use serde::Serialize;

#[derive(Serialize)]
pub struct DevicesPayload {
    pub inputs: Vec<DeviceInfo>,
    pub outputs: Vec<DeviceInfo>,
    pub layout: Vec<ChannelRole>,
}

#[derive(Serialize)]
pub struct ErrorPayload {
    pub code: i32,
    pub message: String,
    /// Localized text for display
    pub text: String,
}

impl ErrorPayload {
    pub fn new(err: &ChannelTestError, localizer: &dyn Localizer) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
            text: localizer.error_text(err),
        }
    }
}

#[derive(Serialize)]
pub struct ChannelPayload<'a> {
    pub channel: usize,
    pub name: String,
    pub rms_db: f64,
    pub statuses: &'a [ChannelStatus],
    pub status_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<FrequencyResponse>,
}

#[derive(Serialize)]
pub struct OutcomePayload {
    pub channel: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_db: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl OutcomePayload {
    pub fn new(outcome: &ChannelOutcome, localizer: &dyn Localizer) -> Self {
        match &outcome.result {
            Ok(report) => Self {
                channel: outcome.channel,
                rms_db: Some(report.rms_db),
                error: None,
            },
            Err(err) => Self {
                channel: outcome.channel,
                rms_db: None,
                error: Some(ErrorPayload::new(err, localizer)),
            },
        }
    }
}

#[derive(Serialize)]
pub struct TestAllPayload {
    pub outcomes: Vec<OutcomePayload>,
    pub statuses: Vec<ChannelStatus>,
    pub status_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<FrequencyResponse>,
}

#[derive(Serialize)]
pub struct AnalyzePayload<'a> {
    pub file: &'a str,
    pub sample_rate: u32,
    pub samples: usize,
    pub rms_db: f64,
    pub response: FrequencyResponse,
}

/// One label line per channel, in channel order
pub fn status_lines(
    statuses: &[ChannelStatus],
    layout: &[ChannelRole],
    localizer: &dyn Localizer,
) -> Vec<String> {
    statuses
        .iter()
        .enumerate()
        .map(|(channel, status)| {
            let role = layout.get(channel).copied().unwrap_or(ChannelRole::Unknown);
            localizer.status_line(channel, role, status)
        })
        .collect()
}

pub fn channel_payload<'a>(
    report: &'a ChannelReport,
    layout: &[ChannelRole],
    localizer: &dyn Localizer,
    response: Option<FrequencyResponse>,
) -> ChannelPayload<'a> {
    ChannelPayload {
        channel: report.channel,
        name: localizer.role_name(report.role, report.channel),
        rms_db: report.rms_db,
        statuses: &report.statuses,
        status_lines: status_lines(&report.statuses, layout, localizer),
        response,
    }
}
