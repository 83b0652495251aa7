// Progress events for channel tests
//
// Published on a broadcast channel while channels are tested so a UI can
// highlight the channel being played and refresh its label afterwards.

use crate::error::{ChannelTestError, ErrorCode};

/// One step of a channel test run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event")]
pub enum ChannelProgress {
    /// Stimulus is about to play on `channel`
    Started { channel: usize },
    /// Measurement stored for `channel`
    Measured { channel: usize, rms_db: f64 },
    /// Test of `channel` failed; other channels are unaffected
    Failed {
        channel: usize,
        code: i32,
        message: String,
    },
    /// Run stopped before `next_channel` was tested
    Cancelled { next_channel: usize },
}

impl ChannelProgress {
    pub fn failed(channel: usize, err: &ChannelTestError) -> Self {
        ChannelProgress::Failed {
            channel,
            code: err.code(),
            message: err.message(),
        }
    }

    /// Channel this event refers to
    pub fn channel(&self) -> usize {
        match self {
            ChannelProgress::Started { channel }
            | ChannelProgress::Measured { channel, .. }
            | ChannelProgress::Failed { channel, .. } => *channel,
            ChannelProgress::Cancelled { next_channel } => *next_channel,
        }
    }
}
