//! Dynamics processors: compressor, lookahead limiter, gate
//!
//! All three share one engine: an asymmetric envelope follower feeding a
//! static gain computer. Parameters arrive as an immutable `DynamicsParams`
//! and are swapped wholesale; the envelope survives a parameter change so a
//! moving control never clicks.

use sage_core::{
    LINEAR_FLOOR, Sample, SageError, SageResult, db_to_linear, linear_to_db, validate_sample_rate,
};
use serde::{Deserialize, Serialize};

use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Ratios at or above this count as limiting
pub const MIN_LIMITER_RATIO: f64 = 100.0;

/// Longest supported limiter lookahead
pub const MAX_LOOKAHEAD_MS: f64 = 50.0;

/// One-pole smoothing coefficient for a time constant in seconds
#[inline]
fn time_coeff(seconds: f64, sample_rate: f64) -> f64 {
    if seconds <= 0.0 {
        0.0
    } else {
        (-1.0 / (seconds * sample_rate)).exp()
    }
}

/// Envelope follower for dynamics processing
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack_s: f64,
    release_s: f64,
    attack_coeff: f64,
    release_coeff: f64,
    envelope: f64,
    sample_rate: f64,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_times(sample_rate, 0.010, 0.100)
    }

    pub fn with_times(sample_rate: f64, attack_s: f64, release_s: f64) -> Self {
        let mut follower = Self {
            attack_s,
            release_s,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            sample_rate,
        };
        follower.set_times(attack_s, release_s);
        follower
    }

    /// Set attack and release times in seconds (envelope value is kept)
    pub fn set_times(&mut self, attack_s: f64, release_s: f64) {
        self.attack_s = attack_s;
        self.release_s = release_s;
        self.attack_coeff = time_coeff(attack_s, self.sample_rate);
        self.release_coeff = time_coeff(release_s, self.sample_rate);
    }

    /// Re-derive coefficients for a new rate; the envelope restarts at zero
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.set_times(self.attack_s, self.release_s);
        self.envelope = 0.0;
    }

    #[inline(always)]
    pub fn process(&mut self, input: Sample) -> f64 {
        let abs_input = input.abs();
        let coeff = if abs_input > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = abs_input + coeff * (self.envelope - abs_input);
        self.envelope
    }

    pub fn process_block(&mut self, input: &[Sample], output: &mut [f64]) {
        debug_assert_eq!(input.len(), output.len());
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.process(x);
        }
    }

    /// Clear the envelope. Call between sessions only.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    pub fn current(&self) -> f64 {
        self.envelope
    }
}

/// Threshold/ratio/knee/time parameters shared by every dynamics processor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsParams {
    pub threshold_db: f64,
    pub ratio: f64,
    pub knee_db: f64,
    pub attack_s: f64,
    pub release_s: f64,
    pub makeup_db: f64,
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            knee_db: 0.0,
            attack_s: 0.010,
            release_s: 0.100,
            makeup_db: 0.0,
        }
    }
}

impl DynamicsParams {
    pub fn new(threshold_db: f64, ratio: f64) -> Self {
        Self {
            threshold_db,
            ratio,
            ..Default::default()
        }
    }

    pub fn with_knee(mut self, knee_db: f64) -> Self {
        self.knee_db = knee_db;
        self
    }

    pub fn with_times(mut self, attack_s: f64, release_s: f64) -> Self {
        self.attack_s = attack_s;
        self.release_s = release_s;
        self
    }

    pub fn with_makeup(mut self, makeup_db: f64) -> Self {
        self.makeup_db = makeup_db;
        self
    }

    pub fn validate(&self) -> SageResult<()> {
        if !self.threshold_db.is_finite() {
            return Err(SageError::InvalidParam(format!(
                "threshold {} dB is not finite",
                self.threshold_db
            )));
        }
        if !self.ratio.is_finite() || self.ratio < 1.0 {
            return Err(SageError::InvalidParam(format!(
                "ratio must be >= 1, got {}",
                self.ratio
            )));
        }
        if !self.knee_db.is_finite() || self.knee_db < 0.0 {
            return Err(SageError::InvalidParam(format!(
                "knee must be >= 0 dB, got {}",
                self.knee_db
            )));
        }
        for (name, value) in [("attack", self.attack_s), ("release", self.release_s)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SageError::InvalidParam(format!(
                    "{name} must be a positive time, got {value} s"
                )));
            }
        }
        if !self.makeup_db.is_finite() {
            return Err(SageError::InvalidParam(format!(
                "makeup {} dB is not finite",
                self.makeup_db
            )));
        }
        Ok(())
    }
}

/// Static gain curve (dB in, dB of reduction out)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainComputer {
    threshold_db: f64,
    ratio: f64,
    knee_db: f64,
}

impl GainComputer {
    pub fn new(params: &DynamicsParams) -> Self {
        Self {
            threshold_db: params.threshold_db,
            ratio: params.ratio,
            knee_db: params.knee_db,
        }
    }

    /// Downward compression curve with quadratic soft knee
    #[inline]
    pub fn reduction_db(&self, env_db: f64) -> f64 {
        let half_knee = self.knee_db / 2.0;
        let slope = 1.0 - 1.0 / self.ratio;

        if env_db <= self.threshold_db - half_knee {
            0.0
        } else if env_db >= self.threshold_db + half_knee {
            (env_db - self.threshold_db) * slope
        } else {
            // Only reachable with a non-zero knee
            let x = env_db - self.threshold_db + half_knee;
            x * x / (2.0 * self.knee_db) * slope
        }
    }

    /// Downward expansion below threshold, capped at `range_db`
    #[inline]
    pub fn expander_reduction_db(&self, env_db: f64, range_db: f64) -> f64 {
        if env_db >= self.threshold_db {
            0.0
        } else {
            ((self.threshold_db - env_db) * (self.ratio - 1.0)).min(range_db)
        }
    }
}

#[inline]
fn env_db(envelope: f64) -> f64 {
    linear_to_db(envelope.max(LINEAR_FLOOR))
}

/// Feed-forward compressor
#[derive(Debug, Clone)]
pub struct Compressor {
    params: DynamicsParams,
    computer: GainComputer,
    envelope: EnvelopeFollower,
    makeup: f64,
    gain_reduction_db: f64,
    sample_rate: f64,
}

impl Compressor {
    pub fn new(sample_rate: f64, params: DynamicsParams) -> SageResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        params.validate()?;
        Ok(Self {
            params,
            computer: GainComputer::new(&params),
            envelope: EnvelopeFollower::with_times(sample_rate, params.attack_s, params.release_s),
            makeup: db_to_linear(params.makeup_db),
            gain_reduction_db: 0.0,
            sample_rate,
        })
    }

    /// Replace all parameters; rejected sets leave the current ones active.
    ///
    /// Does not log, so it may run on the audio thread between blocks with
    /// values taken from a `ParamQueue`. Validate on the sending side first.
    pub fn set_params(&mut self, params: DynamicsParams) -> SageResult<()> {
        params.validate()?;
        self.params = params;
        self.computer = GainComputer::new(&params);
        self.envelope.set_times(params.attack_s, params.release_s);
        self.makeup = db_to_linear(params.makeup_db);
        Ok(())
    }

    pub fn params(&self) -> &DynamicsParams {
        &self.params
    }

    /// Current gain reduction in dB (positive = attenuating)
    pub fn gain_reduction_db(&self) -> f64 {
        self.gain_reduction_db
    }

    /// Static input/output curve for display
    pub fn transfer_db(&self, input_db: f64) -> f64 {
        input_db - self.computer.reduction_db(input_db) + self.params.makeup_db
    }
}

impl Processor for Compressor {
    fn reset(&mut self) {
        self.envelope.reset();
        self.gain_reduction_db = 0.0;
    }
}

impl MonoProcessor for Compressor {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let envelope = self.envelope.process(input);
        let reduction = self.computer.reduction_db(env_db(envelope));
        self.gain_reduction_db = reduction;
        input * db_to_linear(-reduction) * self.makeup
    }
}

impl ProcessorConfig for Compressor {
    fn set_sample_rate(&mut self, sample_rate: f64) -> SageResult<()> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        self.envelope.set_sample_rate(self.sample_rate);
        Ok(())
    }
}

/// Monotonic-deque running maximum over a fixed window
///
/// Storage is sized once; `push` never allocates.
#[derive(Debug, Clone)]
struct SlidingMax {
    slots: Vec<(u64, f64)>,
    head: usize,
    len: usize,
    window: u64,
}

impl SlidingMax {
    fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            slots: vec![(0, 0.0); window],
            head: 0,
            len: 0,
            window: window as u64,
        }
    }

    /// Insert `value` at `index`; returns the max over the last `window` indices
    #[inline]
    fn push(&mut self, index: u64, value: f64) -> f64 {
        let cap = self.slots.len();

        while self.len > 0 && self.slots[self.head].0 + self.window <= index {
            self.head = (self.head + 1) % cap;
            self.len -= 1;
        }
        while self.len > 0 {
            let back = (self.head + self.len - 1) % cap;
            if self.slots[back].1 <= value {
                self.len -= 1;
            } else {
                break;
            }
        }

        let tail = (self.head + self.len) % cap;
        self.slots[tail] = (index, value);
        self.len += 1;
        self.slots[self.head].1
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// Lookahead peak limiter
///
/// The input is delayed by the lookahead; gain is computed from the loudest
/// sample anywhere in the delay line so reduction is in place before the
/// peak reaches the output.
#[derive(Debug, Clone)]
pub struct Limiter {
    params: DynamicsParams,
    lookahead_ms: f64,
    computer: GainComputer,
    attack_coeff: f64,
    release_coeff: f64,
    makeup: f64,
    gain: f64,
    delay: Vec<Sample>,
    delay_pos: usize,
    peak_ahead: SlidingMax,
    index: u64,
    sample_rate: f64,
}

impl Limiter {
    pub fn new(sample_rate: f64, params: DynamicsParams, lookahead_ms: f64) -> SageResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        Self::validate(&params, lookahead_ms)?;
        let lookahead = Self::lookahead_samples(lookahead_ms, sample_rate);

        Ok(Self {
            params,
            lookahead_ms,
            computer: GainComputer::new(&params),
            attack_coeff: time_coeff(params.attack_s, sample_rate),
            release_coeff: time_coeff(params.release_s, sample_rate),
            makeup: db_to_linear(params.makeup_db),
            gain: 1.0,
            delay: vec![0.0; lookahead],
            delay_pos: 0,
            peak_ahead: SlidingMax::new(lookahead + 1),
            index: 0,
            sample_rate,
        })
    }

    fn validate(params: &DynamicsParams, lookahead_ms: f64) -> SageResult<()> {
        params.validate()?;
        if params.ratio < MIN_LIMITER_RATIO {
            return Err(SageError::InvalidParam(format!(
                "limiter ratio must be >= {MIN_LIMITER_RATIO}, got {}",
                params.ratio
            )));
        }
        if !lookahead_ms.is_finite() || lookahead_ms <= 0.0 || lookahead_ms > MAX_LOOKAHEAD_MS {
            return Err(SageError::InvalidParam(format!(
                "lookahead must be in (0, {MAX_LOOKAHEAD_MS}] ms, got {lookahead_ms}"
            )));
        }
        if params.attack_s * 1000.0 > lookahead_ms {
            return Err(SageError::InvalidParam(format!(
                "attack {} ms exceeds lookahead {} ms",
                params.attack_s * 1000.0,
                lookahead_ms
            )));
        }
        Ok(())
    }

    fn lookahead_samples(lookahead_ms: f64, sample_rate: f64) -> usize {
        ((lookahead_ms * sample_rate / 1000.0).round() as usize).max(1)
    }

    /// Replace parameters, keeping lookahead and gain state (no logging)
    pub fn set_params(&mut self, params: DynamicsParams) -> SageResult<()> {
        Self::validate(&params, self.lookahead_ms)?;
        self.params = params;
        self.computer = GainComputer::new(&params);
        self.attack_coeff = time_coeff(params.attack_s, self.sample_rate);
        self.release_coeff = time_coeff(params.release_s, self.sample_rate);
        self.makeup = db_to_linear(params.makeup_db);
        Ok(())
    }

    pub fn params(&self) -> &DynamicsParams {
        &self.params
    }

    pub fn lookahead_ms(&self) -> f64 {
        self.lookahead_ms
    }

    pub fn gain_reduction_db(&self) -> f64 {
        -linear_to_db(self.gain)
    }

    #[inline]
    fn gain_for(&self, level: f64) -> f64 {
        db_to_linear(-self.computer.reduction_db(env_db(level)))
    }
}

impl Processor for Limiter {
    fn reset(&mut self) {
        self.gain = 1.0;
        self.delay.fill(0.0);
        self.delay_pos = 0;
        self.peak_ahead.clear();
        self.index = 0;
    }

    fn latency(&self) -> usize {
        self.delay.len()
    }
}

impl MonoProcessor for Limiter {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let delayed = self.delay[self.delay_pos];
        self.delay[self.delay_pos] = input;
        self.delay_pos = (self.delay_pos + 1) % self.delay.len();

        // Window covers everything still in the delay line plus the sample leaving it
        let peak = self.peak_ahead.push(self.index, input.abs());
        self.index += 1;

        let target = self.gain_for(peak);
        let coeff = if target < self.gain {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain = target + coeff * (self.gain - target);

        // Never let the outgoing sample exceed the curve
        self.gain = self.gain.min(self.gain_for(delayed.abs()));

        delayed * self.gain * self.makeup
    }
}

impl ProcessorConfig for Limiter {
    fn set_sample_rate(&mut self, sample_rate: f64) -> SageResult<()> {
        *self = Self::new(sample_rate, self.params, self.lookahead_ms)?;
        Ok(())
    }
}

/// Noise gate (downward expander with hold and range)
#[derive(Debug, Clone)]
pub struct Gate {
    params: DynamicsParams,
    range_db: f64,
    hold_s: f64,
    computer: GainComputer,
    envelope: EnvelopeFollower,
    makeup: f64,
    hold_samples: usize,
    hold_counter: usize,
    gain_reduction_db: f64,
    sample_rate: f64,
}

impl Gate {
    pub fn new(
        sample_rate: f64,
        params: DynamicsParams,
        range_db: f64,
        hold_s: f64,
    ) -> SageResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        Self::validate(&params, range_db, hold_s)?;
        Ok(Self {
            params,
            range_db,
            hold_s,
            computer: GainComputer::new(&params),
            envelope: EnvelopeFollower::with_times(sample_rate, params.attack_s, params.release_s),
            makeup: db_to_linear(params.makeup_db),
            hold_samples: (hold_s * sample_rate).round() as usize,
            hold_counter: 0,
            gain_reduction_db: 0.0,
            sample_rate,
        })
    }

    fn validate(params: &DynamicsParams, range_db: f64, hold_s: f64) -> SageResult<()> {
        params.validate()?;
        if !range_db.is_finite() || range_db < 0.0 {
            return Err(SageError::InvalidParam(format!(
                "gate range must be >= 0 dB, got {range_db}"
            )));
        }
        if !hold_s.is_finite() || hold_s < 0.0 {
            return Err(SageError::InvalidParam(format!(
                "gate hold must be >= 0 s, got {hold_s}"
            )));
        }
        Ok(())
    }

    /// Replace parameters, keeping the envelope (no logging)
    pub fn set_params(
        &mut self,
        params: DynamicsParams,
        range_db: f64,
        hold_s: f64,
    ) -> SageResult<()> {
        Self::validate(&params, range_db, hold_s)?;
        self.params = params;
        self.range_db = range_db;
        self.hold_s = hold_s;
        self.computer = GainComputer::new(&params);
        self.envelope.set_times(params.attack_s, params.release_s);
        self.makeup = db_to_linear(params.makeup_db);
        self.hold_samples = (hold_s * self.sample_rate).round() as usize;
        Ok(())
    }

    pub fn params(&self) -> &DynamicsParams {
        &self.params
    }

    pub fn range_db(&self) -> f64 {
        self.range_db
    }

    pub fn gain_reduction_db(&self) -> f64 {
        self.gain_reduction_db
    }
}

impl Processor for Gate {
    fn reset(&mut self) {
        self.envelope.reset();
        self.hold_counter = 0;
        self.gain_reduction_db = 0.0;
    }
}

impl MonoProcessor for Gate {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let level_db = env_db(self.envelope.process(input));

        let reduction = if level_db >= self.params.threshold_db {
            self.hold_counter = self.hold_samples;
            0.0
        } else if self.hold_counter > 0 {
            self.hold_counter -= 1;
            0.0
        } else {
            self.computer.expander_reduction_db(level_db, self.range_db)
        };

        self.gain_reduction_db = reduction;
        input * db_to_linear(-reduction) * self.makeup
    }
}

impl ProcessorConfig for Gate {
    fn set_sample_rate(&mut self, sample_rate: f64) -> SageResult<()> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        self.envelope.set_sample_rate(self.sample_rate);
        self.hold_samples = (self.hold_s * self.sample_rate).round() as usize;
        self.hold_counter = 0;
        Ok(())
    }
}

/// Serializable description of one dynamics processor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DynamicsSettings {
    Compressor {
        params: DynamicsParams,
    },
    Limiter {
        params: DynamicsParams,
        lookahead_ms: f64,
    },
    Gate {
        params: DynamicsParams,
        range_db: f64,
        hold_s: f64,
    },
}

impl DynamicsSettings {
    pub fn params(&self) -> &DynamicsParams {
        match self {
            DynamicsSettings::Compressor { params }
            | DynamicsSettings::Limiter { params, .. }
            | DynamicsSettings::Gate { params, .. } => params,
        }
    }

    /// Validate without building; logs rejections (control side only)
    pub fn validate(&self) -> SageResult<()> {
        let result = match *self {
            DynamicsSettings::Compressor { params } => params.validate(),
            DynamicsSettings::Limiter {
                params,
                lookahead_ms,
            } => Limiter::validate(&params, lookahead_ms),
            DynamicsSettings::Gate {
                params,
                range_db,
                hold_s,
            } => Gate::validate(&params, range_db, hold_s),
        };
        if let Err(err) = &result {
            log::warn!("rejected dynamics settings {self:?}: {err}");
        }
        result
    }

    pub fn build(&self, sample_rate: f64) -> SageResult<DynamicsProcessor> {
        self.validate()?;
        log::debug!("building {self:?} at {sample_rate} Hz");
        Ok(match *self {
            DynamicsSettings::Compressor { params } => {
                DynamicsProcessor::Compressor(Compressor::new(sample_rate, params)?)
            }
            DynamicsSettings::Limiter {
                params,
                lookahead_ms,
            } => DynamicsProcessor::Limiter(Limiter::new(sample_rate, params, lookahead_ms)?),
            DynamicsSettings::Gate {
                params,
                range_db,
                hold_s,
            } => DynamicsProcessor::Gate(Gate::new(sample_rate, params, range_db, hold_s)?),
        })
    }
}

/// Any of the dynamics processors behind one type
#[derive(Debug, Clone)]
pub enum DynamicsProcessor {
    Compressor(Compressor),
    Limiter(Limiter),
    Gate(Gate),
}

impl DynamicsProcessor {
    pub fn gain_reduction_db(&self) -> f64 {
        match self {
            DynamicsProcessor::Compressor(c) => c.gain_reduction_db(),
            DynamicsProcessor::Limiter(l) => l.gain_reduction_db(),
            DynamicsProcessor::Gate(g) => g.gain_reduction_db(),
        }
    }
}

impl Processor for DynamicsProcessor {
    fn reset(&mut self) {
        match self {
            DynamicsProcessor::Compressor(c) => c.reset(),
            DynamicsProcessor::Limiter(l) => l.reset(),
            DynamicsProcessor::Gate(g) => g.reset(),
        }
    }

    fn latency(&self) -> usize {
        match self {
            DynamicsProcessor::Compressor(c) => c.latency(),
            DynamicsProcessor::Limiter(l) => l.latency(),
            DynamicsProcessor::Gate(g) => g.latency(),
        }
    }
}

impl MonoProcessor for DynamicsProcessor {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        match self {
            DynamicsProcessor::Compressor(c) => c.process_sample(input),
            DynamicsProcessor::Limiter(l) => l.process_sample(input),
            DynamicsProcessor::Gate(g) => g.process_sample(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f64 = 48000.0;

    fn settle<P: MonoProcessor>(processor: &mut P, level: f64, samples: usize) -> Sample {
        let mut out = 0.0;
        for _ in 0..samples {
            out = processor.process_sample(level);
        }
        out
    }

    #[test]
    fn test_envelope_attack_release() {
        let mut env = EnvelopeFollower::with_times(SR, 0.001, 0.050);
        for _ in 0..4800 {
            env.process(1.0);
        }
        assert!(env.current() > 0.99);

        // One release time constant later the envelope sits near 1/e
        for _ in 0..2400 {
            env.process(0.0);
        }
        assert_abs_diff_eq!(env.current(), (-1.0f64).exp(), epsilon = 0.01);
    }

    #[test]
    fn test_envelope_survives_time_change() {
        let mut env = EnvelopeFollower::new(SR);
        for _ in 0..4800 {
            env.process(0.5);
        }
        let before = env.current();
        env.set_times(0.005, 0.2);
        assert_eq!(env.current(), before);

        env.set_sample_rate(96000.0);
        assert_eq!(env.current(), 0.0);
    }

    #[test]
    fn test_gain_computer_regions() {
        let hard = GainComputer::new(&DynamicsParams::new(-20.0, 4.0));
        assert_eq!(hard.reduction_db(-30.0), 0.0);
        assert_eq!(hard.reduction_db(-20.0), 0.0);
        assert_abs_diff_eq!(hard.reduction_db(-10.0), 7.5, epsilon = 1e-12);

        let soft = GainComputer::new(&DynamicsParams::new(-20.0, 4.0).with_knee(6.0));
        // Centre of the knee: (3^2 / 12) * 0.75
        assert_abs_diff_eq!(soft.reduction_db(-20.0), 0.5625, epsilon = 1e-12);
        // Continuous at both knee edges
        assert_abs_diff_eq!(soft.reduction_db(-23.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(soft.reduction_db(-17.0), 3.0 * 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(soft.reduction_db(-17.0 - 1e-9), 2.25, epsilon = 1e-6);
    }

    #[test]
    fn test_expander_curve() {
        let gate = GainComputer::new(&DynamicsParams::new(-40.0, 3.0));
        assert_eq!(gate.expander_reduction_db(-30.0, 60.0), 0.0);
        assert_abs_diff_eq!(gate.expander_reduction_db(-45.0, 60.0), 10.0, epsilon = 1e-12);
        assert_eq!(gate.expander_reduction_db(-100.0, 60.0), 60.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(DynamicsParams::default().validate().is_ok());
        assert!(DynamicsParams::new(-20.0, 0.5).validate().is_err());
        assert!(DynamicsParams::new(f64::NAN, 4.0).validate().is_err());
        assert!(DynamicsParams::new(-20.0, 4.0).with_knee(-1.0).validate().is_err());
        assert!(DynamicsParams::new(-20.0, 4.0).with_times(0.0, 0.1).validate().is_err());
        let endless = DynamicsParams::new(-20.0, 4.0).with_times(0.01, f64::INFINITY);
        assert!(endless.validate().is_err());
    }

    #[test]
    fn test_compressor_identity_below_threshold() {
        let mut comp = Compressor::new(SR, DynamicsParams::new(-20.0, 4.0)).unwrap();
        let level = db_to_linear(-30.0);
        let out = settle(&mut comp, level, 48000);
        assert_abs_diff_eq!(out, level, epsilon = 1e-12);
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_compressor_ratio() {
        let mut comp = Compressor::new(SR, DynamicsParams::new(-20.0, 4.0)).unwrap();
        let out = settle(&mut comp, db_to_linear(-10.0), 48000);
        assert_abs_diff_eq!(comp.gain_reduction_db(), 7.5, epsilon = 1e-3);
        assert_abs_diff_eq!(linear_to_db(out), -17.5, epsilon = 1e-3);
    }

    #[test]
    fn test_compressor_makeup_and_transfer() {
        let params = DynamicsParams::new(-20.0, 2.0).with_makeup(3.0);
        let comp = Compressor::new(SR, params).unwrap();
        assert_abs_diff_eq!(comp.transfer_db(-40.0), -37.0, epsilon = 1e-12);
        assert_abs_diff_eq!(comp.transfer_db(-10.0), -15.0 + 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compressor_rejects_bad_params() {
        let mut comp = Compressor::new(SR, DynamicsParams::default()).unwrap();
        let before = *comp.params();
        assert!(comp.set_params(DynamicsParams::new(-20.0, 0.0)).is_err());
        assert_eq!(*comp.params(), before);
    }

    #[test]
    fn test_compressor_set_params_keeps_envelope() {
        let mut comp = Compressor::new(SR, DynamicsParams::new(-20.0, 4.0)).unwrap();
        settle(&mut comp, db_to_linear(-10.0), 48000);
        comp.set_params(DynamicsParams::new(-20.0, 8.0)).unwrap();
        // Envelope is already settled, so the new curve applies at once
        comp.process_sample(db_to_linear(-10.0));
        assert_abs_diff_eq!(comp.gain_reduction_db(), 10.0 * (1.0 - 1.0 / 8.0), epsilon = 1e-3);
    }

    fn limiter_params() -> DynamicsParams {
        DynamicsParams::new(-6.0, 100.0).with_times(0.001, 0.100)
    }

    #[test]
    fn test_limiter_latency() {
        let limiter = Limiter::new(SR, limiter_params(), 5.0).unwrap();
        assert_eq!(limiter.latency(), 240);
    }

    #[test]
    fn test_limiter_validation() {
        let low_ratio = DynamicsParams::new(-1.0, 20.0).with_times(0.001, 0.1);
        assert!(Limiter::new(SR, low_ratio, 5.0).is_err());
        // Attack longer than the lookahead
        let slow_attack = DynamicsParams::new(-1.0, 100.0).with_times(0.010, 0.1);
        assert!(Limiter::new(SR, slow_attack, 5.0).is_err());
        assert!(Limiter::new(SR, limiter_params(), 0.0).is_err());
        assert!(Limiter::new(SR, limiter_params(), 500.0).is_err());
    }

    #[test]
    fn test_limiter_holds_ceiling() {
        let mut limiter = Limiter::new(SR, limiter_params(), 5.0).unwrap();
        let ceiling = db_to_linear(-6.0 + 0.1);

        let mut peak: f64 = 0.0;
        for i in 0..48000 {
            let x = (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / SR).sin();
            let y = limiter.process_sample(x);
            peak = peak.max(y.abs());
        }
        assert!(peak <= ceiling, "peak {} dB", linear_to_db(peak));
        assert!(peak > db_to_linear(-7.0));
    }

    #[test]
    fn test_limiter_reacts_before_peak() {
        let mut limiter = Limiter::new(SR, limiter_params(), 5.0).unwrap();
        for _ in 0..1000 {
            limiter.process_sample(0.0);
        }
        // The spike enters the delay line; output is still the silent past
        let out = limiter.process_sample(1.0);
        assert_eq!(out, 0.0);
        assert!(limiter.gain_reduction_db() > 0.0);

        let mut emitted = 0.0;
        for _ in 0..limiter.latency() {
            emitted = limiter.process_sample(0.0);
        }
        assert!(emitted > 0.0);
        assert!(emitted <= db_to_linear(-6.0 + 0.1));
    }

    #[test]
    fn test_sliding_max() {
        let mut window = SlidingMax::new(3);
        let values = [1.0, 3.0, 2.0, 0.5, 0.2, 0.1, 4.0];
        let expected = [1.0, 3.0, 3.0, 3.0, 2.0, 0.5, 4.0];
        for (i, (&v, &e)) in values.iter().zip(&expected).enumerate() {
            assert_eq!(window.push(i as u64, v), e);
        }
    }

    #[test]
    fn test_gate_attenuates_below_threshold() {
        let params = DynamicsParams::new(-40.0, 10.0).with_times(0.001, 0.010);
        let mut gate = Gate::new(SR, params, 40.0, 0.0).unwrap();

        let quiet = db_to_linear(-60.0);
        let out = settle(&mut gate, quiet, 9600);
        assert_abs_diff_eq!(gate.gain_reduction_db(), 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(linear_to_db(out), -100.0, epsilon = 1e-6);

        let loud = db_to_linear(-20.0);
        let out = settle(&mut gate, loud, 9600);
        assert_eq!(gate.gain_reduction_db(), 0.0);
        assert_abs_diff_eq!(out, loud, epsilon = 1e-12);
    }

    #[test]
    fn test_gate_hold() {
        let params = DynamicsParams::new(-40.0, 10.0).with_times(0.0005, 0.001);
        let mut gate = Gate::new(SR, params, 60.0, 0.050).unwrap();

        settle(&mut gate, db_to_linear(-20.0), 4800);
        // 20 ms of silence: envelope is gone but hold keeps the gate open
        settle(&mut gate, 0.0, 960);
        assert_eq!(gate.gain_reduction_db(), 0.0);

        // 100 ms later the gate has closed to its full range
        settle(&mut gate, 0.0, 4800);
        assert_eq!(gate.gain_reduction_db(), 60.0);
    }

    #[test]
    fn test_gate_validation() {
        let params = DynamicsParams::new(-40.0, 10.0);
        assert!(Gate::new(SR, params, -1.0, 0.0).is_err());
        assert!(Gate::new(SR, params, 40.0, -0.1).is_err());
    }

    #[test]
    fn test_settings_build_and_serde() {
        let settings = DynamicsSettings::Limiter {
            params: limiter_params(),
            lookahead_ms: 5.0,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"type\":\"limiter\""));
        let back: DynamicsSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);

        let processor = back.build(SR).unwrap();
        assert_eq!(processor.latency(), 240);

        let bad = DynamicsSettings::Gate {
            params: DynamicsParams::default(),
            range_db: f64::NAN,
            hold_s: 0.0,
        };
        assert!(bad.validate().is_err());
        assert!(bad.build(SR).is_err());
    }
}
