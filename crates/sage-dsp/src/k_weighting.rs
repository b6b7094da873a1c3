//! ITU-R BS.1770-4 K-weighting pre-filter
//!
//! Stage 1 is the head-effect high shelf, stage 2 the RLB high-pass. Both are
//! derived from their analog prototypes with the bilinear transform, so any
//! operating rate is supported and 48 kHz reproduces the published table.

use sage_core::{Sample, SageResult, validate_sample_rate};
use std::f64::consts::PI;

use crate::biquad::{Biquad, BiquadCoeffs};
use crate::{MonoProcessor, Processor, ProcessorConfig};

const SHELF_FREQ: f64 = 1681.974450955533;
const SHELF_GAIN_DB: f64 = 3.999843853973347;
const SHELF_Q: f64 = 0.7071752369554196;
const SHELF_BAND_EXPONENT: f64 = 0.4996667741545416;

const HIGHPASS_FREQ: f64 = 38.13547087602444;
const HIGHPASS_Q: f64 = 0.5003270373238773;

/// Head-effect shelf coefficients at `sample_rate`
pub fn shelf_coeffs(sample_rate: f64) -> SageResult<BiquadCoeffs> {
    let k = (PI * SHELF_FREQ / sample_rate).tan();
    let vh = 10.0_f64.powf(SHELF_GAIN_DB / 20.0);
    let vb = vh.powf(SHELF_BAND_EXPONENT);
    let k_q = k / SHELF_Q;
    let k2 = k * k;

    BiquadCoeffs::normalized(
        vh + vb * k_q + k2,
        2.0 * (k2 - vh),
        vh - vb * k_q + k2,
        1.0 + k_q + k2,
        2.0 * (k2 - 1.0),
        1.0 - k_q + k2,
    )
}

/// RLB high-pass coefficients at `sample_rate`
///
/// The numerator is left unnormalised (`1, -2, 1`) as in the BS.1770 table.
pub fn highpass_coeffs(sample_rate: f64) -> SageResult<BiquadCoeffs> {
    let k = (PI * HIGHPASS_FREQ / sample_rate).tan();
    let k_q = k / HIGHPASS_Q;
    let k2 = k * k;
    let a0 = 1.0 + k_q + k2;

    BiquadCoeffs::normalized(a0, -2.0 * a0, a0, a0, 2.0 * (k2 - 1.0), 1.0 - k_q + k2)
}

/// K-weighting filter for one channel
#[derive(Debug, Clone)]
pub struct KWeightingFilter {
    shelf: Biquad,
    highpass: Biquad,
}

impl KWeightingFilter {
    pub fn new(sample_rate: f64) -> SageResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        Ok(Self {
            shelf: Biquad::with_coeffs(shelf_coeffs(sample_rate)?, sample_rate),
            highpass: Biquad::with_coeffs(highpass_coeffs(sample_rate)?, sample_rate),
        })
    }

    #[inline]
    pub fn process_sample(&mut self, input: Sample) -> Sample {
        let shelved = self.shelf.process_sample(input);
        self.highpass.process_sample(shelved)
    }

    /// Filter `input` into `output` (lengths must match)
    pub fn process(&mut self, input: &[Sample], output: &mut [Sample]) {
        debug_assert_eq!(input.len(), output.len());
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.process_sample(x);
        }
    }

    pub fn process_in_place(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    pub fn stages(&self) -> (&BiquadCoeffs, &BiquadCoeffs) {
        (self.shelf.coeffs(), self.highpass.coeffs())
    }

    pub fn sample_rate(&self) -> f64 {
        self.shelf.sample_rate()
    }
}

impl Processor for KWeightingFilter {
    fn reset(&mut self) {
        self.shelf.reset();
        self.highpass.reset();
    }
}

impl ProcessorConfig for KWeightingFilter {
    fn set_sample_rate(&mut self, sample_rate: f64) -> SageResult<()> {
        *self = Self::new(sample_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_48k_table() {
        let shelf = shelf_coeffs(48000.0).unwrap();
        assert_abs_diff_eq!(shelf.b0, 1.53512485958697, epsilon = 1e-10);
        assert_abs_diff_eq!(shelf.b1, -2.69169618940638, epsilon = 1e-10);
        assert_abs_diff_eq!(shelf.b2, 1.19839281085285, epsilon = 1e-10);
        assert_abs_diff_eq!(shelf.a1, -1.69065929318241, epsilon = 1e-10);
        assert_abs_diff_eq!(shelf.a2, 0.73248077421585, epsilon = 1e-10);

        let hp = highpass_coeffs(48000.0).unwrap();
        assert_eq!((hp.b0, hp.b1, hp.b2), (1.0, -2.0, 1.0));
        assert_abs_diff_eq!(hp.a1, -1.99004745483398, epsilon = 1e-10);
        assert_abs_diff_eq!(hp.a2, 0.99007225036621, epsilon = 1e-10);
    }

    #[test]
    fn test_response_shape() {
        let sr = 48000.0;
        let shelf = shelf_coeffs(sr).unwrap();
        let hp = highpass_coeffs(sr).unwrap();
        let total = |f: f64| shelf.magnitude_db(f, sr) + hp.magnitude_db(f, sr);

        // Roughly flat at 1 kHz (the 997 Hz reference lands near +0.69 dB)
        assert!(total(1000.0).abs() < 1.0);
        // Shelf lifts the top end by ~4 dB
        assert_abs_diff_eq!(total(10000.0), 4.0, epsilon = 0.3);
        // RLB rolls off the bottom end
        assert!(total(20.0) < -10.0);
    }

    #[test]
    fn test_other_rates_stable() {
        for sr in [8000.0, 44100.0, 96000.0, 192000.0] {
            let filter = KWeightingFilter::new(sr).unwrap();
            let (shelf, hp) = filter.stages();
            assert!(shelf.is_stable() && hp.is_stable());
        }
    }

    #[test]
    fn test_deterministic() {
        let input: Vec<Sample> = (0..4800)
            .map(|i| (2.0 * PI * 440.0 * i as f64 / 48000.0).sin() * 0.5)
            .collect();
        let mut a = KWeightingFilter::new(48000.0).unwrap();
        let mut b = KWeightingFilter::new(48000.0).unwrap();
        let mut out_a = vec![0.0; input.len()];
        a.process(&input, &mut out_a);
        let mut out_b = input.clone();
        b.process_in_place(&mut out_b);

        for (x, y) in out_a.iter().zip(&out_b) {
            assert!((x - y).abs() <= 1e-9);
        }

        a.reset();
        let mut again = vec![0.0; input.len()];
        a.process(&input, &mut again);
        assert_eq!(again, out_a);
    }
}
