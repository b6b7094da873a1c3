//! True-peak detection (ITU-R BS.1770-4 Annex 2)
//!
//! 4x polyphase interpolation with a 48-tap Kaiser-windowed sinc, 12 taps per
//! phase. Each phase is normalised to unity DC gain so settled full-scale DC
//! reads exactly 0 dBTP. The raw input sample takes part in the peak search,
//! which keeps the true peak at or above the sample peak.

use sage_core::{Sample, SageResult, linear_to_db, validate_sample_rate};
use std::f64::consts::PI;

use crate::Processor;

/// Oversampling factor
pub const OVERSAMPLE: usize = 4;

/// Taps per polyphase branch
pub const TAPS_PER_PHASE: usize = 12;

const TOTAL_TAPS: usize = OVERSAMPLE * TAPS_PER_PHASE;
const KAISER_BETA: f64 = 8.0;

/// Zeroth-order modified Bessel function (series expansion)
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..64 {
        let factor = half / k as f64;
        term *= factor * factor;
        sum += term;
        if term < 1e-12 * sum {
            break;
        }
    }
    sum
}

fn design_phases() -> [[f64; TAPS_PER_PHASE]; OVERSAMPLE] {
    let center = (TOTAL_TAPS - 1) as f64 / 2.0;
    let i0_beta = bessel_i0(KAISER_BETA);

    let mut phases = [[0.0; TAPS_PER_PHASE]; OVERSAMPLE];
    for n in 0..TOTAL_TAPS {
        // Cutoff at the input Nyquist: sinc over the oversampled grid
        let t = (n as f64 - center) / OVERSAMPLE as f64;
        let sinc = if t.abs() < 1e-12 {
            1.0
        } else {
            (PI * t).sin() / (PI * t)
        };
        let r = 2.0 * n as f64 / (TOTAL_TAPS - 1) as f64 - 1.0;
        let window = bessel_i0(KAISER_BETA * (1.0 - r * r).max(0.0).sqrt()) / i0_beta;

        phases[n % OVERSAMPLE][n / OVERSAMPLE] = sinc * window;
    }

    for phase in phases.iter_mut() {
        let sum: f64 = phase.iter().sum();
        if sum.abs() > f64::EPSILON {
            for tap in phase.iter_mut() {
                *tap /= sum;
            }
        }
    }
    phases
}

/// Inter-sample peak detector for one channel
#[derive(Debug, Clone)]
pub struct TruePeakDetector {
    phases: [[f64; TAPS_PER_PHASE]; OVERSAMPLE],
    /// Mirrored history: `history[pos..pos + TAPS_PER_PHASE]` is newest-first
    history: [f64; 2 * TAPS_PER_PHASE],
    pos: usize,
    peak: f64,
    sample_rate: f64,
}

impl TruePeakDetector {
    pub fn new(sample_rate: f64) -> SageResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        Ok(Self {
            phases: design_phases(),
            history: [0.0; 2 * TAPS_PER_PHASE],
            pos: 0,
            peak: 0.0,
            sample_rate,
        })
    }

    /// Push one sample, returning its local (linear) true peak
    #[inline]
    pub fn process_sample(&mut self, input: Sample) -> f64 {
        self.pos = (self.pos + TAPS_PER_PHASE - 1) % TAPS_PER_PHASE;
        self.history[self.pos] = input;
        self.history[self.pos + TAPS_PER_PHASE] = input;

        let window = &self.history[self.pos..self.pos + TAPS_PER_PHASE];
        let mut local = input.abs();
        for phase in &self.phases {
            let y: f64 = phase.iter().zip(window).map(|(h, x)| h * x).sum();
            local = local.max(y.abs());
        }

        self.peak = self.peak.max(local);
        local
    }

    /// True peak of `block` in dBTP; also advances the running peak
    pub fn measure(&mut self, block: &[Sample]) -> f64 {
        let mut block_peak: f64 = 0.0;
        for &x in block {
            block_peak = block_peak.max(self.process_sample(x));
        }
        linear_to_db(block_peak)
    }

    /// Running linear peak since the last reset
    #[inline]
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Running peak in dBTP (floored at `DB_FLOOR` for silence)
    #[inline]
    pub fn peak_dbtp(&self) -> f64 {
        linear_to_db(self.peak)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Processor for TruePeakDetector {
    /// Clear history and running peak. Call between sessions only.
    fn reset(&mut self) {
        self.history = [0.0; 2 * TAPS_PER_PHASE];
        self.pos = 0;
        self.peak = 0.0;
    }
}
