//! Channel roles and ITU-R BS.1770 channel weights

use serde::{Deserialize, Serialize};

/// Loudspeaker role of a channel in the measured signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    Left,
    Right,
    Center,
    /// Low-frequency effects; excluded from loudness
    Lfe,
    LeftSurround,
    RightSurround,
}

impl ChannelRole {
    /// BS.1770 weighting coefficient `Gi`
    #[inline]
    pub fn weight(self) -> f64 {
        match self {
            ChannelRole::Left | ChannelRole::Right | ChannelRole::Center => 1.0,
            ChannelRole::Lfe => 0.0,
            ChannelRole::LeftSurround | ChannelRole::RightSurround => 1.41,
        }
    }
}

/// Common channel layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// L, R, C, LFE, Ls, Rs
    Surround51,
}

impl ChannelLayout {
    pub fn roles(self) -> &'static [ChannelRole] {
        match self {
            ChannelLayout::Mono => &[ChannelRole::Center],
            ChannelLayout::Stereo => &[ChannelRole::Left, ChannelRole::Right],
            ChannelLayout::Surround51 => &[
                ChannelRole::Left,
                ChannelRole::Right,
                ChannelRole::Center,
                ChannelRole::Lfe,
                ChannelRole::LeftSurround,
                ChannelRole::RightSurround,
            ],
        }
    }

    #[inline]
    pub fn channel_count(self) -> usize {
        self.roles().len()
    }

    /// Guess a layout from a channel count (files carry no role metadata)
    pub fn from_channel_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            6 => Some(ChannelLayout::Surround51),
            _ => None,
        }
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::Stereo
    }
}
