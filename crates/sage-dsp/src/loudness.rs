//! BS.1770-4 / EBU R128 loudness measurement
//!
//! `LoudnessAccumulator` consumes K-weighted 100 ms hops and derives
//! momentary (400 ms), short-term (3 s) and gated integrated loudness.
//! `LoudnessMeter` wraps it with per-channel K-weighting, hop buffering for
//! arbitrary callback sizes, and true-peak tracking.

use sage_core::{
    ChannelLayout, ChannelRole, DB_FLOOR, Sample, SageError, SageResult, linear_to_db,
    mean_square, power_to_lufs, validate_sample_rate,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Processor;
use crate::bridge::MeterPublisher;
use crate::gating::GatingHistory;
use crate::k_weighting::KWeightingFilter;
use crate::true_peak::TruePeakDetector;

/// Hop length in seconds (75 % overlap of the 400 ms window)
pub const HOP_SECONDS: f64 = 0.1;

/// Hops per momentary window (400 ms)
pub const MOMENTARY_HOPS: usize = 4;

/// Hops per short-term window (3 s)
pub const SHORT_TERM_HOPS: usize = 30;

const INSUFFICIENT_DATA_BITS: u64 = 0x7FF8_0000_0000_0001;
const ALL_BLOCKS_GATED_BITS: u64 = 0x7FF8_0000_0000_0002;

/// A loudness value or the reason there is none
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LoudnessReading {
    /// Loudness in LUFS
    Value(f64),
    /// Not enough audio has been measured yet
    InsufficientData,
    /// Every block fell under the absolute gate
    AllBlocksGated,
}

impl LoudnessReading {
    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            LoudnessReading::Value(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_value(self) -> bool {
        matches!(self, LoudnessReading::Value(_))
    }

    /// Encode into one word; sentinels use reserved NaN payloads
    #[inline]
    pub fn to_bits(self) -> u64 {
        match self {
            LoudnessReading::Value(v) if v.is_finite() => v.to_bits(),
            LoudnessReading::Value(_) | LoudnessReading::InsufficientData => {
                INSUFFICIENT_DATA_BITS
            }
            LoudnessReading::AllBlocksGated => ALL_BLOCKS_GATED_BITS,
        }
    }

    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        match bits {
            INSUFFICIENT_DATA_BITS => LoudnessReading::InsufficientData,
            ALL_BLOCKS_GATED_BITS => LoudnessReading::AllBlocksGated,
            _ => {
                let v = f64::from_bits(bits);
                if v.is_finite() {
                    LoudnessReading::Value(v)
                } else {
                    LoudnessReading::InsufficientData
                }
            }
        }
    }
}

impl From<Option<f64>> for LoudnessReading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(LoudnessReading::InsufficientData, LoudnessReading::Value)
    }
}

impl fmt::Display for LoudnessReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoudnessReading::Value(v) => write!(f, "{v:.1} LUFS"),
            _ => write!(f, "--"),
        }
    }
}

/// Hop-power ring plus optional gating history
///
/// Every call is O(1) except `integrated()` and `loudness_range()`, which
/// scan the history.
#[derive(Debug, Clone)]
pub struct LoudnessAccumulator {
    weights: Vec<f64>,
    hop_powers: [f64; SHORT_TERM_HOPS],
    write_idx: usize,
    hops: u64,
    momentary: LoudnessReading,
    short_term: LoudnessReading,
    last_block_power: Option<f64>,
    last_short_term_power: Option<f64>,
    max_momentary: Option<f64>,
    max_short_term: Option<f64>,
    history: Option<GatingHistory>,
}

impl LoudnessAccumulator {
    /// `roles` gives one entry per input channel
    pub fn new(roles: &[ChannelRole], retain_history: bool) -> Self {
        Self {
            weights: roles.iter().map(|r| r.weight()).collect(),
            hop_powers: [0.0; SHORT_TERM_HOPS],
            write_idx: 0,
            hops: 0,
            momentary: LoudnessReading::InsufficientData,
            short_term: LoudnessReading::InsufficientData,
            last_block_power: None,
            last_short_term_power: None,
            max_momentary: None,
            max_short_term: None,
            history: retain_history.then(GatingHistory::new),
        }
    }

    /// Reserve gating history for `seconds` more audio; stored blocks are kept
    pub fn reserve_seconds(&mut self, seconds: f64) {
        if let Some(history) = self.history.as_mut() {
            let hops = (seconds / HOP_SECONDS).ceil().max(0.0) as usize;
            history.reserve(hops);
        }
    }

    /// Append one K-weighted hop (one slice per channel, equal lengths)
    pub fn append_block<C: AsRef<[Sample]>>(&mut self, channels: &[C]) {
        debug_assert_eq!(channels.len(), self.weights.len());

        let power: f64 = channels
            .iter()
            .zip(&self.weights)
            .map(|(ch, &w)| w * mean_square(ch.as_ref()))
            .sum();

        self.hop_powers[self.write_idx] = if power.is_finite() { power } else { 0.0 };
        self.write_idx = (self.write_idx + 1) % SHORT_TERM_HOPS;
        self.hops += 1;

        self.last_block_power = None;
        self.last_short_term_power = None;

        if self.hops >= MOMENTARY_HOPS as u64 {
            let block = self.window_power(MOMENTARY_HOPS);
            let lufs = power_to_lufs(block);
            self.momentary = LoudnessReading::Value(lufs);
            self.max_momentary = Some(self.max_momentary.map_or(lufs, |m| m.max(lufs)));
            self.last_block_power = Some(block);
            if let Some(history) = self.history.as_mut() {
                history.push_block(block);
            }
        }

        if self.hops >= SHORT_TERM_HOPS as u64 {
            let window = self.window_power(SHORT_TERM_HOPS);
            let lufs = power_to_lufs(window);
            self.short_term = LoudnessReading::Value(lufs);
            self.max_short_term = Some(self.max_short_term.map_or(lufs, |m| m.max(lufs)));
            self.last_short_term_power = Some(window);
            if let Some(history) = self.history.as_mut() {
                history.push_short_term(window);
            }
        }
    }

    /// Mean of the most recent `count` hop powers
    fn window_power(&self, count: usize) -> f64 {
        let sum: f64 = (1..=count)
            .map(|back| {
                self.hop_powers[(self.write_idx + SHORT_TERM_HOPS - back) % SHORT_TERM_HOPS]
            })
            .sum();
        sum / count as f64
    }

    #[inline]
    pub fn momentary(&self) -> LoudnessReading {
        self.momentary
    }

    #[inline]
    pub fn short_term(&self) -> LoudnessReading {
        self.short_term
    }

    /// Gated integrated loudness; `InsufficientData` without history
    pub fn integrated(&self) -> LoudnessReading {
        self.history
            .as_ref()
            .map_or(LoudnessReading::InsufficientData, GatingHistory::integrated)
    }

    pub fn loudness_range(&self) -> Option<f64> {
        self.history.as_ref().and_then(GatingHistory::loudness_range)
    }

    pub fn max_momentary(&self) -> LoudnessReading {
        self.max_momentary.into()
    }

    pub fn max_short_term(&self) -> LoudnessReading {
        self.max_short_term.into()
    }

    /// 400 ms block power completed by the last hop, if any
    #[inline]
    pub fn last_block_power(&self) -> Option<f64> {
        self.last_block_power
    }

    /// 3 s window power completed by the last hop, if any
    #[inline]
    pub fn last_short_term_power(&self) -> Option<f64> {
        self.last_short_term_power
    }

    #[inline]
    pub fn hops(&self) -> u64 {
        self.hops
    }

    pub fn channel_count(&self) -> usize {
        self.weights.len()
    }

    pub fn history(&self) -> Option<&GatingHistory> {
        self.history.as_ref()
    }

    /// Start a new session. Call between sessions only.
    pub fn reset(&mut self) {
        self.hop_powers = [0.0; SHORT_TERM_HOPS];
        self.write_idx = 0;
        self.hops = 0;
        self.momentary = LoudnessReading::InsufficientData;
        self.short_term = LoudnessReading::InsufficientData;
        self.last_block_power = None;
        self.last_short_term_power = None;
        self.max_momentary = None;
        self.max_short_term = None;
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
    }
}

/// Loudness meter configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessMeterConfig {
    pub sample_rate: f64,
    pub layout: ChannelLayout,
    /// Keep the gating history needed for integrated loudness and LRA.
    /// It grows with the session; real-time paths turn it off and let the
    /// bridge reader own the history instead.
    pub retain_history: bool,
    /// Run per-channel true-peak detection
    pub true_peak: bool,
}

impl Default for LoudnessMeterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            layout: ChannelLayout::Stereo,
            retain_history: true,
            true_peak: true,
        }
    }
}

impl LoudnessMeterConfig {
    pub fn new(sample_rate: f64, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            layout,
            ..Default::default()
        }
    }

    pub fn with_history(mut self, retain: bool) -> Self {
        self.retain_history = retain;
        self
    }

    pub fn with_true_peak(mut self, enabled: bool) -> Self {
        self.true_peak = enabled;
        self
    }

    pub fn validate(&self) -> SageResult<()> {
        validate_sample_rate(self.sample_rate)?;
        Ok(())
    }

    /// Samples per 100 ms hop
    pub fn hop_len(&self) -> usize {
        (self.sample_rate * HOP_SECONDS).round() as usize
    }
}

/// Summary of a finished measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessReport {
    pub integrated: LoudnessReading,
    pub loudness_range: Option<f64>,
    pub max_momentary: LoudnessReading,
    pub max_short_term: LoudnessReading,
    /// `None` when true-peak detection is disabled
    pub true_peak_dbtp: Option<f64>,
    pub sample_peak_db: f64,
    pub duration_s: f64,
}

/// Multi-channel loudness meter for arbitrary callback sizes
#[derive(Debug)]
pub struct LoudnessMeter {
    config: LoudnessMeterConfig,
    k_filters: Vec<KWeightingFilter>,
    hop_buffers: Vec<Vec<Sample>>,
    hop_len: usize,
    filled: usize,
    accumulator: LoudnessAccumulator,
    true_peak: Vec<TruePeakDetector>,
    sample_peak: Vec<f64>,
    frames: u64,
    publisher: Option<MeterPublisher>,
}

impl LoudnessMeter {
    pub fn new(config: LoudnessMeterConfig) -> SageResult<Self> {
        config.validate()?;
        let roles = config.layout.roles();
        let hop_len = config.hop_len().max(1);

        let k_filters = roles
            .iter()
            .map(|_| KWeightingFilter::new(config.sample_rate))
            .collect::<SageResult<Vec<_>>>()?;
        let true_peak = if config.true_peak {
            roles
                .iter()
                .map(|_| TruePeakDetector::new(config.sample_rate))
                .collect::<SageResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        log::debug!(
            "loudness meter: {:?} @ {} Hz, hop {} samples, history {}, true peak {}",
            config.layout,
            config.sample_rate,
            hop_len,
            config.retain_history,
            config.true_peak
        );

        Ok(Self {
            config,
            k_filters,
            hop_buffers: vec![vec![0.0; hop_len]; roles.len()],
            hop_len,
            filled: 0,
            accumulator: LoudnessAccumulator::new(roles, config.retain_history),
            true_peak,
            sample_peak: vec![0.0; roles.len()],
            frames: 0,
            publisher: None,
        })
    }

    /// Publish every completed hop to a meter bridge
    pub fn attach_publisher(&mut self, publisher: MeterPublisher) {
        self.publisher = Some(publisher);
    }

    /// Reserve gating history for `seconds` of audio (offline use)
    pub fn reserve_seconds(&mut self, seconds: f64) {
        self.accumulator.reserve_seconds(seconds);
    }

    /// Real-time entry point: one slice per configured channel.
    ///
    /// Never fails; extra channels are ignored and the shortest slice sets
    /// the frame count.
    pub fn process<C: AsRef<[Sample]>>(&mut self, channels: &[C]) {
        debug_assert_eq!(channels.len(), self.k_filters.len());
        if channels.len() < self.k_filters.len() {
            return;
        }
        if let Some(publisher) = self.publisher.as_mut() {
            publisher.flush();
        }
        let frames = channels
            .iter()
            .take(self.k_filters.len())
            .map(|c| c.as_ref().len())
            .min()
            .unwrap_or(0);

        let mut offset = 0;
        while offset < frames {
            let take = (self.hop_len - self.filled).min(frames - offset);
            let end = offset + take;

            for (ch, input) in channels.iter().enumerate().take(self.k_filters.len()) {
                let input = &input.as_ref()[offset..end];
                let dest = &mut self.hop_buffers[ch][self.filled..self.filled + take];
                self.k_filters[ch].process(input, dest);

                let peak = input.iter().fold(self.sample_peak[ch], |m, x| m.max(x.abs()));
                self.sample_peak[ch] = peak;
                if let Some(detector) = self.true_peak.get_mut(ch) {
                    for &x in input {
                        detector.process_sample(x);
                    }
                }
            }

            self.filled += take;
            offset = end;

            if self.filled == self.hop_len {
                self.accumulator.append_block(&self.hop_buffers);
                self.filled = 0;
                if let Some(publisher) = self.publisher.as_mut() {
                    let true_peak = self
                        .true_peak
                        .iter()
                        .fold(0.0f64, |m, d| m.max(d.peak()));
                    publisher.publish(&self.accumulator, linear_to_db(true_peak));
                }
            }
        }
        self.frames += frames as u64;
    }

    /// Offline entry point: validates the channel layout first
    pub fn process_checked<C: AsRef<[Sample]>>(&mut self, channels: &[C]) -> SageResult<()> {
        let expected = self.k_filters.len();
        if channels.len() != expected {
            return Err(SageError::ChannelMismatch {
                expected,
                actual: channels.len(),
            });
        }
        if let Some(first) = channels.first() {
            let len = first.as_ref().len();
            if channels.iter().any(|c| c.as_ref().len() != len) {
                return Err(SageError::InvalidParam(
                    "channel slices differ in length".into(),
                ));
            }
        }
        self.process(channels);
        Ok(())
    }

    pub fn momentary(&self) -> LoudnessReading {
        self.accumulator.momentary()
    }

    pub fn short_term(&self) -> LoudnessReading {
        self.accumulator.short_term()
    }

    pub fn integrated(&self) -> LoudnessReading {
        self.accumulator.integrated()
    }

    pub fn loudness_range(&self) -> Option<f64> {
        self.accumulator.loudness_range()
    }

    /// Highest true peak over all channels (dBTP)
    pub fn true_peak_dbtp(&self) -> Option<f64> {
        if self.true_peak.is_empty() {
            return None;
        }
        let peak = self.true_peak.iter().fold(0.0f64, |m, d| m.max(d.peak()));
        Some(linear_to_db(peak))
    }

    /// Per-channel true peaks (dBTP), empty when disabled
    pub fn channel_true_peaks(&self) -> Vec<f64> {
        self.true_peak.iter().map(TruePeakDetector::peak_dbtp).collect()
    }

    /// Highest sample peak over all channels (dBFS)
    pub fn sample_peak_db(&self) -> f64 {
        let peak = self.sample_peak.iter().fold(0.0f64, |m, &p| m.max(p));
        if peak > 0.0 { linear_to_db(peak) } else { DB_FLOOR }
    }

    pub fn duration_s(&self) -> f64 {
        self.frames as f64 / self.config.sample_rate
    }

    pub fn report(&self) -> LoudnessReport {
        LoudnessReport {
            integrated: self.integrated(),
            loudness_range: self.loudness_range(),
            max_momentary: self.accumulator.max_momentary(),
            max_short_term: self.accumulator.max_short_term(),
            true_peak_dbtp: self.true_peak_dbtp(),
            sample_peak_db: self.sample_peak_db(),
            duration_s: self.duration_s(),
        }
    }

    pub fn accumulator(&self) -> &LoudnessAccumulator {
        &self.accumulator
    }

    pub fn config(&self) -> &LoudnessMeterConfig {
        &self.config
    }

    pub fn hop_len(&self) -> usize {
        self.hop_len
    }
}

impl Processor for LoudnessMeter {
    /// Start a new measurement session. Call between sessions only.
    fn reset(&mut self) {
        for filter in &mut self.k_filters {
            filter.reset();
        }
        for detector in &mut self.true_peak {
            detector.reset();
        }
        for buffer in &mut self.hop_buffers {
            buffer.fill(0.0);
        }
        self.filled = 0;
        self.sample_peak.fill(0.0);
        self.frames = 0;
        self.accumulator.reset();
        if let Some(publisher) = self.publisher.as_mut() {
            publisher.begin_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sage_core::lufs_to_power;

    /// DC hop at the amplitude whose mean-square lands on `lufs`
    fn hop_at(lufs: f64, len: usize) -> Vec<Sample> {
        vec![lufs_to_power(lufs).sqrt(); len]
    }

    #[test]
    fn test_reading_bits_roundtrip() {
        for reading in [
            LoudnessReading::Value(-23.0),
            LoudnessReading::Value(-200.691),
            LoudnessReading::InsufficientData,
            LoudnessReading::AllBlocksGated,
        ] {
            assert_eq!(LoudnessReading::from_bits(reading.to_bits()), reading);
        }
        assert_eq!(
            LoudnessReading::from_bits(f64::NAN.to_bits()),
            LoudnessReading::InsufficientData
        );
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(LoudnessReading::Value(-14.04).to_string(), "-14.0 LUFS");
        assert_eq!(LoudnessReading::InsufficientData.to_string(), "--");
        assert_eq!(LoudnessReading::AllBlocksGated.to_string(), "--");
    }

    #[test]
    fn test_warmup_sentinels() {
        let mut acc = LoudnessAccumulator::new(&[ChannelRole::Center], true);
        assert_eq!(acc.momentary(), LoudnessReading::InsufficientData);
        assert_eq!(acc.integrated(), LoudnessReading::InsufficientData);

        let hop = hop_at(-20.0, 480);
        for _ in 0..3 {
            acc.append_block(&[&hop]);
        }
        assert_eq!(acc.momentary(), LoudnessReading::InsufficientData);

        acc.append_block(&[&hop]);
        assert_abs_diff_eq!(acc.momentary().value().unwrap(), -20.0, epsilon = 1e-9);
        assert_eq!(acc.short_term(), LoudnessReading::InsufficientData);

        for _ in 4..SHORT_TERM_HOPS {
            acc.append_block(&[&hop]);
        }
        assert_abs_diff_eq!(acc.short_term().value().unwrap(), -20.0, epsilon = 1e-9);
        assert_eq!(acc.hops(), SHORT_TERM_HOPS as u64);
    }

    #[test]
    fn test_channel_weights() {
        let roles = ChannelLayout::Surround51.roles();
        let mut acc = LoudnessAccumulator::new(roles, false);
        let hop = hop_at(-30.0, 480);
        let silent = vec![0.0; 480];

        // LFE alone contributes nothing
        let mut only_lfe: Vec<&[Sample]> = vec![silent.as_slice(); 6];
        only_lfe[3] = hop.as_slice();
        for _ in 0..MOMENTARY_HOPS {
            acc.append_block(&only_lfe);
        }
        assert!(acc.momentary().value().unwrap() < -150.0);

        // A surround channel is weighted by 1.41 (+1.49 dB)
        acc.reset();
        let mut only_ls: Vec<&[Sample]> = vec![silent.as_slice(); 6];
        only_ls[4] = hop.as_slice();
        for _ in 0..MOMENTARY_HOPS {
            acc.append_block(&only_ls);
        }
        let expected = -30.0 + 10.0 * 1.41f64.log10();
        assert_abs_diff_eq!(acc.momentary().value().unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_silence_stays_finite() {
        let mut acc = LoudnessAccumulator::new(&[ChannelRole::Left, ChannelRole::Right], true);
        let silent = vec![0.0; 480];
        for _ in 0..SHORT_TERM_HOPS {
            acc.append_block(&[&silent, &silent]);
        }
        assert!(acc.momentary().value().unwrap().is_finite());
        assert!(acc.short_term().value().unwrap().is_finite());
        assert_eq!(acc.integrated(), LoudnessReading::AllBlocksGated);
    }

    #[test]
    fn test_history_disabled() {
        let mut acc = LoudnessAccumulator::new(&[ChannelRole::Center], false);
        let hop = hop_at(-20.0, 480);
        for _ in 0..10 {
            acc.append_block(&[&hop]);
        }
        assert!(acc.momentary().is_value());
        assert_eq!(acc.integrated(), LoudnessReading::InsufficientData);
        assert!(acc.history().is_none());
    }

    #[test]
    fn test_reserve_keeps_measured_blocks() {
        let config = LoudnessMeterConfig::new(48000.0, ChannelLayout::Mono);
        let mut meter = LoudnessMeter::new(config).unwrap();
        let tone: Vec<Sample> = (0..48000)
            .map(|i| 0.1 * (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 48000.0).sin())
            .collect();
        meter.process(&[&tone]);
        let before = meter.accumulator().history().unwrap().blocks().to_vec();
        assert_eq!(before.len(), 7);

        meter.reserve_seconds(10.0);
        let history = meter.accumulator().history().unwrap();
        assert_eq!(history.blocks(), before.as_slice());
        assert!(meter.integrated().is_value());
    }

    #[test]
    fn test_reset_starts_new_session() {
        let mut acc = LoudnessAccumulator::new(&[ChannelRole::Center], true);
        let hop = hop_at(-20.0, 480);
        for _ in 0..8 {
            acc.append_block(&[&hop]);
        }
        acc.reset();
        assert_eq!(acc.hops(), 0);
        assert_eq!(acc.momentary(), LoudnessReading::InsufficientData);
        assert_eq!(acc.max_momentary(), LoudnessReading::InsufficientData);
        assert_eq!(acc.integrated(), LoudnessReading::InsufficientData);
    }

    #[test]
    fn test_meter_buffers_small_callbacks() {
        let config = LoudnessMeterConfig::new(48000.0, ChannelLayout::Mono);
        let mut meter = LoudnessMeter::new(config).unwrap();
        assert_eq!(meter.hop_len(), 4800);

        let block = vec![0.1; 128];
        // 40 callbacks of 128 = 5120 samples: one full hop
        for _ in 0..40 {
            meter.process(&[&block]);
        }
        assert_eq!(meter.accumulator().hops(), 1);
        assert_abs_diff_eq!(meter.duration_s(), 5120.0 / 48000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_meter_rejects_channel_mismatch() {
        let mut meter = LoudnessMeter::new(LoudnessMeterConfig::default()).unwrap();
        let block = vec![0.0; 64];
        let err = meter.process_checked(&[&block]).unwrap_err();
        assert!(matches!(
            err,
            SageError::ChannelMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_meter_rejects_bad_rate() {
        let config = LoudnessMeterConfig::new(0.0, ChannelLayout::Stereo);
        assert!(LoudnessMeter::new(config).is_err());
    }

    #[test]
    fn test_meter_true_peak_toggle() {
        let config = LoudnessMeterConfig::new(48000.0, ChannelLayout::Stereo).with_true_peak(false);
        let mut meter = LoudnessMeter::new(config).unwrap();
        let block = vec![0.5; 256];
        meter.process(&[&block, &block]);
        assert_eq!(meter.true_peak_dbtp(), None);
        assert_abs_diff_eq!(meter.sample_peak_db(), linear_to_db(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: LoudnessMeterConfig =
            serde_json::from_str(r#"{"sample_rate":44100.0,"layout":"Mono"}"#).unwrap();
        assert!(config.retain_history);
        assert!(config.true_peak);
        assert_eq!(config.hop_len(), 4410);
    }
}
