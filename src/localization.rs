//! Localized user-facing text.
//!
//! Algorithms never produce display strings. A UI asks a [`Localizer`] for
//! the text of a [`MessageKey`] and fills in placeholders such as `{i}`.
//! Built-in tables cover English and Russian.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::calibration::{ChannelRole, ChannelStatus, Suggestion};
use crate::error::{CalibrationError, CaptureError, ChannelTestError};

/// UI language, stored in settings by its native name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "English")]
    English,
    #[serde(rename = "Русский")]
    Russian,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Russian];

    /// Name as shown in the language picker and stored in settings
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Русский",
        }
    }

    /// Parse a settings value; unknown names yield `None`
    pub fn from_native_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.native_name() == name)
    }
}

/// Stable identifiers for every user-facing string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    AppTitle,
    InputDevice,
    OutputDevice,
    ErrorMargin,
    TestAllChannels,
    NotTested,
    Channel,
    IncreaseVolume,
    DecreaseVolume,
    ChannelOk,
    NoData,
    LanguageLabel,
    /// `{input_fs}`, `{fs}`
    FrequencyMismatch,
    /// `{error}`
    DeviceError,
    /// `{channel}`
    ChannelNotExist,
    LeftFront,
    RightFront,
    Center,
    Subwoofer,
    LeftRear,
    RightRear,
    LeftSide,
    RightSide,
    Unknown,
    ShowResponse,
    NoDevicesFound,
    Error,
    OverallResponse,
    /// `{i}`
    ChannelResponse,
    /// `{i}`
    ChannelNotTested,
    FrequencyTicks,
    Apply,
    ShowOverallResponse,
    TicksUpdated,
    InvalidTicks,
    NoOverallData,
    RecordingTooShort,
    /// `{i}`, `{name}`
    PlayChannel,
    /// `{i}`, `{status}`
    ChannelStatusLine,
    /// `{i}`, `{name}`, `{status}`
    ChannelRoleStatusLine,
    /// `{i}`, `{rms}`, `{suggestion}`
    ChannelLevelLine,
    /// `{i}`, `{rms}`
    ChannelLevelOnlyLine,
    AutoShowResponse,
    TestDuration,
    RawResponse,
    SmoothedResponse,
    FilteredResponse,
    FrequencyAxis,
    AmplitudeAxis,
}

type Table = HashMap<MessageKey, &'static str>;

static ENGLISH: Lazy<Table> = Lazy::new(|| {
    use MessageKey::*;
    HashMap::from([
        (AppTitle, "White Noise Channel Tester"),
        (InputDevice, "Input Device:"),
        (OutputDevice, "Output Device:"),
        (ErrorMargin, "Allowed Error (dB):"),
        (TestAllChannels, "Test All Channels"),
        (NotTested, "Not Tested"),
        (Channel, "Channel"),
        (IncreaseVolume, "Increase Volume"),
        (DecreaseVolume, "Decrease Volume"),
        (ChannelOk, "Channel is calibrated"),
        (NoData, "No data"),
        (LanguageLabel, "Language:"),
        (
            FrequencyMismatch,
            "Sample rate mismatch between input and output devices ({input_fs} != {fs}).",
        ),
        (DeviceError, "Device access error: {error}"),
        (ChannelNotExist, "Channel {channel} does not exist on the selected device."),
        (LeftFront, "Left Front"),
        (RightFront, "Right Front"),
        (Center, "Center"),
        (Subwoofer, "Subwoofer"),
        (LeftRear, "Left Rear"),
        (RightRear, "Right Rear"),
        (LeftSide, "Left Side"),
        (RightSide, "Right Side"),
        (Unknown, "Unknown"),
        (ShowResponse, "Show FR"),
        (NoDevicesFound, "No audio devices found."),
        (Error, "Error"),
        (OverallResponse, "Overall Frequency Response"),
        (ChannelResponse, "Channel {i} Frequency Response"),
        (ChannelNotTested, "Channel {i} not tested yet."),
        (FrequencyTicks, "Frequency Ticks (Hz):"),
        (Apply, "Apply"),
        (ShowOverallResponse, "Show Overall FR"),
        (TicksUpdated, "Frequency ticks updated."),
        (InvalidTicks, "Invalid frequency ticks input."),
        (NoOverallData, "No data to display overall frequency response."),
        (RecordingTooShort, "Recording duration too short after trimming."),
        (PlayChannel, "Play Channel {i} ({name})"),
        (ChannelStatusLine, "Channel {i}: {status}"),
        (ChannelRoleStatusLine, "Channel {i} ({name}): {status}"),
        (ChannelLevelLine, "Channel {i}: {rms} dB ({suggestion})"),
        (ChannelLevelOnlyLine, "Channel {i}: {rms} dB"),
        (AutoShowResponse, "Auto Show FR after test"),
        (TestDuration, "Test Duration (s):"),
        (RawResponse, "Raw FR"),
        (SmoothedResponse, "Smoothed FR"),
        (FilteredResponse, "Filtered FR"),
        (FrequencyAxis, "Frequency (Hz)"),
        (AmplitudeAxis, "Amplitude (dB)"),
    ])
});

static RUSSIAN: Lazy<Table> = Lazy::new(|| {
    use MessageKey::*;
    HashMap::from([
        (AppTitle, "Тестер каналов с белым шумом"),
        (InputDevice, "Устройство ввода:"),
        (OutputDevice, "Устройство вывода:"),
        (ErrorMargin, "Допустимая погрешность (дБ):"),
        (TestAllChannels, "Тестировать все каналы"),
        (NotTested, "Не тестирован"),
        (Channel, "Канал"),
        (IncreaseVolume, "Увеличьте громкость"),
        (DecreaseVolume, "Уменьшите громкость"),
        (ChannelOk, "Канал настроен"),
        (NoData, "Нет данных"),
        (LanguageLabel, "Язык:"),
        (
            FrequencyMismatch,
            "Частоты дискретизации входного и выходного устройств не совпадают ({input_fs} != {fs}).",
        ),
        (DeviceError, "Ошибка доступа к информации об устройстве: {error}"),
        (ChannelNotExist, "Канал {channel} не существует на выбранном устройстве."),
        (LeftFront, "Левый фронтальный"),
        (RightFront, "Правый фронтальный"),
        (Center, "Центральный"),
        (Subwoofer, "Сабвуфер"),
        (LeftRear, "Левый тыловой"),
        (RightRear, "Правый тыловой"),
        (LeftSide, "Левый боковой"),
        (RightSide, "Правый боковой"),
        (Unknown, "Неизвестно"),
        (ShowResponse, "Показать АЧХ"),
        (NoDevicesFound, "Аудиоустройства не найдены."),
        (Error, "Ошибка"),
        (OverallResponse, "Общая АЧХ"),
        (ChannelResponse, "АЧХ канала {i}"),
        (ChannelNotTested, "Канал {i} еще не протестирован."),
        (FrequencyTicks, "Метки частот (Гц):"),
        (Apply, "Применить"),
        (ShowOverallResponse, "Показать общую АЧХ"),
        (TicksUpdated, "Метки частот обновлены."),
        (InvalidTicks, "Неверный ввод меток частот."),
        (NoOverallData, "Нет данных для отображения общей АЧХ."),
        (RecordingTooShort, "Запись слишком короткая после обрезки."),
        (PlayChannel, "Тестировать канал {i} ({name})"),
        (ChannelStatusLine, "Канал {i}: {status}"),
        (ChannelRoleStatusLine, "Канал {i} ({name}): {status}"),
        (ChannelLevelLine, "Канал {i}: {rms} дБ ({suggestion})"),
        (ChannelLevelOnlyLine, "Канал {i}: {rms} дБ"),
        (AutoShowResponse, "Авто показ АЧХ после теста"),
        (TestDuration, "Длительность теста (с):"),
        (RawResponse, "Сырой АЧХ"),
        (SmoothedResponse, "Сглаженный АЧХ"),
        (FilteredResponse, "Отфильтрованный АЧХ"),
        (FrequencyAxis, "Частота (Гц)"),
        (AmplitudeAxis, "Амплитуда (дБ)"),
    ])
});

/// Replace each `{name}` placeholder in `template` with its value
pub fn fill_template(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// Source of localized text
///
/// Only `text` is required; the other methods compose display strings from
/// calibration types. Channel numbers are shown 1-based.
pub trait Localizer: Send + Sync {
    /// Raw template for `key`, placeholders unfilled
    fn text(&self, key: MessageKey) -> String;

    fn format(&self, key: MessageKey, args: &[(&str, &str)]) -> String {
        fill_template(&self.text(key), args)
    }

    /// Display name of `channel`; unknown roles become "Channel {i}"
    fn role_name(&self, role: ChannelRole, channel: usize) -> String {
        let key = match role {
            ChannelRole::LeftFront => MessageKey::LeftFront,
            ChannelRole::RightFront => MessageKey::RightFront,
            ChannelRole::Center => MessageKey::Center,
            ChannelRole::Subwoofer => MessageKey::Subwoofer,
            ChannelRole::LeftRear => MessageKey::LeftRear,
            ChannelRole::RightRear => MessageKey::RightRear,
            ChannelRole::LeftSide => MessageKey::LeftSide,
            ChannelRole::RightSide => MessageKey::RightSide,
            ChannelRole::Unknown => {
                return format!("{} {}", self.text(MessageKey::Channel), channel + 1)
            }
        };
        self.text(key)
    }

    fn suggestion(&self, suggestion: Suggestion) -> String {
        self.text(match suggestion {
            Suggestion::Ok => MessageKey::ChannelOk,
            Suggestion::IncreaseVolume => MessageKey::IncreaseVolume,
            Suggestion::DecreaseVolume => MessageKey::DecreaseVolume,
        })
    }

    /// Label line for one channel, e.g. "Channel 2: -20.00 dB (Increase Volume)"
    fn status_line(&self, channel: usize, role: ChannelRole, status: &ChannelStatus) -> String {
        let i = (channel + 1).to_string();
        match status {
            ChannelStatus::NotTested => self.format(
                MessageKey::ChannelRoleStatusLine,
                &[
                    ("i", i.as_str()),
                    ("name", self.role_name(role, channel).as_str()),
                    ("status", self.text(MessageKey::NotTested).as_str()),
                ],
            ),
            ChannelStatus::Measured {
                rms_db,
                verdict: Some(verdict),
            } => self.format(
                MessageKey::ChannelLevelLine,
                &[
                    ("i", i.as_str()),
                    ("rms", format!("{:.2}", rms_db).as_str()),
                    ("suggestion", self.suggestion(verdict.suggestion).as_str()),
                ],
            ),
            ChannelStatus::Measured {
                rms_db,
                verdict: None,
            } => self.format(
                MessageKey::ChannelLevelOnlyLine,
                &[("i", i.as_str()), ("rms", format!("{:.2}", rms_db).as_str())],
            ),
        }
    }

    /// User-facing text for a failed channel test
    fn error_text(&self, err: &ChannelTestError) -> String {
        match err {
            ChannelTestError::Capture(CaptureError::SampleRateMismatch {
                input_rate,
                output_rate,
            }) => self.format(
                MessageKey::FrequencyMismatch,
                &[
                    ("input_fs", input_rate.to_string().as_str()),
                    ("fs", output_rate.to_string().as_str()),
                ],
            ),
            ChannelTestError::Capture(CaptureError::ChannelOutOfRange { channel, .. }) => self
                .format(
                    MessageKey::ChannelNotExist,
                    &[("channel", (channel + 1).to_string().as_str())],
                ),
            ChannelTestError::Capture(CaptureError::DeviceError { details }) => {
                self.format(MessageKey::DeviceError, &[("error", details.as_str())])
            }
            ChannelTestError::Capture(
                CaptureError::StreamOpenFailed { reason } | CaptureError::StreamFailure { reason },
            ) => self.format(MessageKey::DeviceError, &[("error", reason.as_str())]),
            ChannelTestError::Calibration(err) => self.calibration_error_text(err),
        }
    }

    fn calibration_error_text(&self, err: &CalibrationError) -> String {
        match err {
            CalibrationError::InsufficientRecording { .. } => {
                self.text(MessageKey::RecordingTooShort)
            }
            CalibrationError::InvalidFrequencyTicks { .. } => self.text(MessageKey::InvalidTicks),
            CalibrationError::ChannelNotTested { channel } => self.format(
                MessageKey::ChannelNotTested,
                &[("i", (channel + 1).to_string().as_str())],
            ),
            CalibrationError::NoMeasurements => self.text(MessageKey::NoOverallData),
            CalibrationError::StatePoisoned => self.text(MessageKey::Error),
        }
    }
}

/// Built-in string table for one language
///
/// Keys missing from a table fall back to English.
#[derive(Debug, Clone, Copy)]
pub struct StringTable {
    language: Language,
}

impl StringTable {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Table for a settings language name; unknown names use English
    pub fn for_setting(name: &str) -> Self {
        match Language::from_native_name(name) {
            Some(language) => Self::new(language),
            None => {
                log::warn!("[Localization] Unknown language {:?}, using English", name);
                Self::new(Language::English)
            }
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn table(&self) -> &'static Table {
        match self.language {
            Language::English => &ENGLISH,
            Language::Russian => &RUSSIAN,
        }
    }
}

impl Localizer for StringTable {
    fn text(&self, key: MessageKey) -> String {
        self.table()
            .get(&key)
            .or_else(|| ENGLISH.get(&key))
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{:?}", key))
    }
}
