// Channel roles - speaker position for each output channel index
//
// Roles depend only on the channel count of the output device. Counts other
// than 2, 6 and 8 have no standard layout and every channel is Unknown.

use serde::{Deserialize, Serialize};

/// Speaker position of an output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    LeftFront,
    RightFront,
    Center,
    Subwoofer,
    LeftRear,
    RightRear,
    LeftSide,
    RightSide,
    Unknown,
}

impl ChannelRole {
    pub fn is_subwoofer(&self) -> bool {
        matches!(self, ChannelRole::Subwoofer)
    }
}

const STEREO: [ChannelRole; 2] = [ChannelRole::LeftFront, ChannelRole::RightFront];

const SURROUND_5_1: [ChannelRole; 6] = [
    ChannelRole::LeftFront,
    ChannelRole::RightFront,
    ChannelRole::Center,
    ChannelRole::Subwoofer,
    ChannelRole::LeftRear,
    ChannelRole::RightRear,
];

const SURROUND_7_1: [ChannelRole; 8] = [
    ChannelRole::LeftFront,
    ChannelRole::RightFront,
    ChannelRole::Center,
    ChannelRole::Subwoofer,
    ChannelRole::LeftSide,
    ChannelRole::RightSide,
    ChannelRole::LeftRear,
    ChannelRole::RightRear,
];

/// Role of every channel for a device with `channel_count` outputs
pub fn channel_layout(channel_count: usize) -> Vec<ChannelRole> {
    match channel_count {
        2 => STEREO.to_vec(),
        6 => SURROUND_5_1.to_vec(),
        8 => SURROUND_7_1.to_vec(),
        n => vec![ChannelRole::Unknown; n],
    }
}
