//! Named presets and delivery loudness targets
//!
//! Every preset is an enum variant with a fixed mapping to a parameter
//! bundle, so an unknown name fails at parse time instead of at run time.

use sage_core::{SageError, SageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::biquad::{FilterSpec, FilterType};
use crate::dynamics::{DynamicsParams, DynamicsSettings};
use crate::loudness::{LoudnessReading, LoudnessReport};

/// Parse `s` against the `name()` of every entry in `all`
fn parse_named<T: Copy>(
    s: &str,
    all: &[T],
    name: fn(T) -> &'static str,
    what: &str,
) -> SageResult<T> {
    all.iter()
        .copied()
        .find(|&item| name(item).eq_ignore_ascii_case(s))
        .ok_or_else(|| {
            let known: Vec<&str> = all.iter().map(|&item| name(item)).collect();
            SageError::InvalidParam(format!(
                "unknown {what} '{s}' (expected one of: {})",
                known.join(", ")
            ))
        })
}

/// Dynamics presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicsPreset {
    /// Gentle soft-knee leveling for sung or spoken vocals
    VocalLeveler,
    /// Fast, punchy bus compression
    DrumBus,
    /// Slow, low-ratio mix-bus glue
    MixGlue,
    /// Firm leveling for speech
    PodcastVoice,
    /// Noise gate for spill and room tone
    NoiseGate,
    /// Streaming master limiter at -1 dBFS
    MasterLimiter,
    /// Broadcast limiter at -2 dBFS
    BroadcastLimiter,
}

impl DynamicsPreset {
    pub const ALL: [DynamicsPreset; 7] = [
        DynamicsPreset::VocalLeveler,
        DynamicsPreset::DrumBus,
        DynamicsPreset::MixGlue,
        DynamicsPreset::PodcastVoice,
        DynamicsPreset::NoiseGate,
        DynamicsPreset::MasterLimiter,
        DynamicsPreset::BroadcastLimiter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DynamicsPreset::VocalLeveler => "vocal-leveler",
            DynamicsPreset::DrumBus => "drum-bus",
            DynamicsPreset::MixGlue => "mix-glue",
            DynamicsPreset::PodcastVoice => "podcast-voice",
            DynamicsPreset::NoiseGate => "noise-gate",
            DynamicsPreset::MasterLimiter => "master-limiter",
            DynamicsPreset::BroadcastLimiter => "broadcast-limiter",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DynamicsPreset::VocalLeveler => "3:1 soft-knee vocal leveling",
            DynamicsPreset::DrumBus => "4:1 fast drum bus compression",
            DynamicsPreset::MixGlue => "2:1 slow mix-bus glue",
            DynamicsPreset::PodcastVoice => "4:1 speech leveling with makeup",
            DynamicsPreset::NoiseGate => "-45 dB gate, 40 dB range, 50 ms hold",
            DynamicsPreset::MasterLimiter => "-1 dBFS lookahead limiter",
            DynamicsPreset::BroadcastLimiter => "-2 dBFS lookahead limiter",
        }
    }

    pub fn settings(self) -> DynamicsSettings {
        match self {
            DynamicsPreset::VocalLeveler => DynamicsSettings::Compressor {
                params: DynamicsParams::new(-18.0, 3.0)
                    .with_knee(6.0)
                    .with_times(0.005, 0.120)
                    .with_makeup(3.0),
            },
            DynamicsPreset::DrumBus => DynamicsSettings::Compressor {
                params: DynamicsParams::new(-12.0, 4.0)
                    .with_knee(2.0)
                    .with_times(0.010, 0.080)
                    .with_makeup(2.0),
            },
            DynamicsPreset::MixGlue => DynamicsSettings::Compressor {
                params: DynamicsParams::new(-10.0, 2.0)
                    .with_knee(6.0)
                    .with_times(0.030, 0.200)
                    .with_makeup(1.0),
            },
            DynamicsPreset::PodcastVoice => DynamicsSettings::Compressor {
                params: DynamicsParams::new(-20.0, 4.0)
                    .with_knee(6.0)
                    .with_times(0.003, 0.150)
                    .with_makeup(4.0),
            },
            DynamicsPreset::NoiseGate => DynamicsSettings::Gate {
                params: DynamicsParams::new(-45.0, 10.0).with_times(0.0005, 0.050),
                range_db: 40.0,
                hold_s: 0.050,
            },
            DynamicsPreset::MasterLimiter => DynamicsSettings::Limiter {
                params: DynamicsParams::new(-1.0, 100.0).with_times(0.0005, 0.050),
                lookahead_ms: 5.0,
            },
            DynamicsPreset::BroadcastLimiter => DynamicsSettings::Limiter {
                params: DynamicsParams::new(-2.0, 100.0).with_times(0.001, 0.100),
                lookahead_ms: 5.0,
            },
        }
    }
}

impl fmt::Display for DynamicsPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DynamicsPreset {
    type Err = SageError;

    fn from_str(s: &str) -> SageResult<Self> {
        parse_named(s, &Self::ALL, Self::name, "dynamics preset")
    }
}

/// EQ presets (one biquad band each)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqPreset {
    RumbleCut,
    VocalPresence,
    AirShelf,
    MudCut,
}

impl EqPreset {
    pub const ALL: [EqPreset; 4] = [
        EqPreset::RumbleCut,
        EqPreset::VocalPresence,
        EqPreset::AirShelf,
        EqPreset::MudCut,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EqPreset::RumbleCut => "rumble-cut",
            EqPreset::VocalPresence => "vocal-presence",
            EqPreset::AirShelf => "air-shelf",
            EqPreset::MudCut => "mud-cut",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EqPreset::RumbleCut => "80 Hz high-pass",
            EqPreset::VocalPresence => "+3 dB bell at 3 kHz",
            EqPreset::AirShelf => "+2.5 dB shelf above 10 kHz",
            EqPreset::MudCut => "-3 dB bell at 300 Hz",
        }
    }

    pub fn filter(self) -> FilterSpec {
        match self {
            EqPreset::RumbleCut => FilterSpec::new(FilterType::Highpass, 80.0, 0.707),
            EqPreset::VocalPresence => {
                FilterSpec::new(FilterType::Peaking, 3000.0, 1.0).with_gain(3.0)
            }
            EqPreset::AirShelf => {
                FilterSpec::new(FilterType::HighShelf, 10000.0, 0.707).with_gain(2.5)
            }
            EqPreset::MudCut => FilterSpec::new(FilterType::Peaking, 300.0, 1.4).with_gain(-3.0),
        }
    }
}

impl fmt::Display for EqPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EqPreset {
    type Err = SageError;

    fn from_str(s: &str) -> SageResult<Self> {
        parse_named(s, &Self::ALL, Self::name, "EQ preset")
    }
}

/// Integrated loudness may sit this far from target and still comply
pub const LOUDNESS_TOLERANCE_LU: f64 = 1.0;

/// Delivery loudness targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoudnessTarget {
    /// Spotify / YouTube / Tidal (-14 LUFS, -1 dBTP)
    Streaming,
    /// Apple Music (-16 LUFS, -1 dBTP)
    AppleMusic,
    /// EBU R128 broadcast (-23 LUFS, -2 dBTP)
    EbuR128,
    /// ATSC A/85 broadcast (-24 LKFS, -2 dBTP)
    AtscA85,
    /// Podcast platforms (-16 LUFS, -1 dBTP)
    Podcast,
}

impl LoudnessTarget {
    pub const ALL: [LoudnessTarget; 5] = [
        LoudnessTarget::Streaming,
        LoudnessTarget::AppleMusic,
        LoudnessTarget::EbuR128,
        LoudnessTarget::AtscA85,
        LoudnessTarget::Podcast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LoudnessTarget::Streaming => "streaming",
            LoudnessTarget::AppleMusic => "apple-music",
            LoudnessTarget::EbuR128 => "ebu-r128",
            LoudnessTarget::AtscA85 => "atsc-a85",
            LoudnessTarget::Podcast => "podcast",
        }
    }

    pub fn target_lufs(self) -> f64 {
        match self {
            LoudnessTarget::Streaming => -14.0,
            LoudnessTarget::AppleMusic => -16.0,
            LoudnessTarget::EbuR128 => -23.0,
            LoudnessTarget::AtscA85 => -24.0,
            LoudnessTarget::Podcast => -16.0,
        }
    }

    /// True-peak ceiling (display and warning only)
    pub fn true_peak_ceiling_dbtp(self) -> f64 {
        match self {
            LoudnessTarget::Streaming
            | LoudnessTarget::AppleMusic
            | LoudnessTarget::Podcast => -1.0,
            LoudnessTarget::EbuR128 | LoudnessTarget::AtscA85 => -2.0,
        }
    }

    /// Compare a finished measurement against this target
    pub fn assess(self, report: &LoudnessReport) -> Assessment {
        let LoudnessReading::Value(integrated) = report.integrated else {
            return Assessment {
                target: self,
                compliance: Compliance::Unmeasurable,
                gain_needed_db: None,
                true_peak_after_gain_dbtp: None,
            };
        };

        let gain = self.target_lufs() - integrated;
        let ceiling = self.true_peak_ceiling_dbtp();
        let peak = report.true_peak_dbtp.unwrap_or(report.sample_peak_db);

        let compliance = if gain < -LOUDNESS_TOLERANCE_LU {
            Compliance::TooLoud
        } else if gain > LOUDNESS_TOLERANCE_LU {
            Compliance::TooQuiet
        } else if peak > ceiling {
            Compliance::PeakOverCeiling
        } else {
            Compliance::Compliant
        };

        Assessment {
            target: self,
            compliance,
            gain_needed_db: Some(gain),
            true_peak_after_gain_dbtp: Some(peak + gain),
        }
    }
}

impl fmt::Display for LoudnessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LoudnessTarget {
    type Err = SageError;

    fn from_str(s: &str) -> SageResult<Self> {
        parse_named(s, &Self::ALL, Self::name, "loudness target")
    }
}

/// Verdict of a target check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compliance {
    Compliant,
    TooLoud,
    TooQuiet,
    /// Loudness is on target but the true peak breaks the ceiling
    PeakOverCeiling,
    /// No integrated loudness (too short, or everything gated)
    Unmeasurable,
}

impl fmt::Display for Compliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Compliance::Compliant => "compliant",
            Compliance::TooLoud => "too loud",
            Compliance::TooQuiet => "too quiet",
            Compliance::PeakOverCeiling => "true peak over ceiling",
            Compliance::Unmeasurable => "unmeasurable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub target: LoudnessTarget,
    pub compliance: Compliance,
    /// Gain that would land integrated loudness on target
    pub gain_needed_db: Option<f64>,
    /// True peak after applying `gain_needed_db`; above the ceiling means a limiter is needed
    pub true_peak_after_gain_dbtp: Option<f64>,
}
