//! Biquad filter implementation using Transposed Direct Form II
//!
//! Coefficients follow the RBJ Audio EQ Cookbook and are normalised so
//! `a0 = 1`. Reconfiguration swaps coefficients only; the delay registers
//! survive so a running filter does not click when its parameters move.

use sage_core::{Sample, SageError, SageResult, validate_sample_rate};
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};

use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Biquad filter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Allpass,
    Peaking,
    LowShelf,
    HighShelf,
}

/// Filter width: quality factor or bandwidth in octaves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterWidth {
    Q(f64),
    Bandwidth(f64),
}

impl Default for FilterWidth {
    fn default() -> Self {
        FilterWidth::Q(std::f64::consts::FRAC_1_SQRT_2)
    }
}

/// Complete filter configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterType,
    pub frequency: f64,
    #[serde(default)]
    pub width: FilterWidth,
    #[serde(default)]
    pub gain_db: f64,
}

impl FilterSpec {
    pub fn new(kind: FilterType, frequency: f64, q: f64) -> Self {
        Self {
            kind,
            frequency,
            width: FilterWidth::Q(q),
            gain_db: 0.0,
        }
    }

    pub fn with_gain(mut self, gain_db: f64) -> Self {
        self.gain_db = gain_db;
        self
    }

    pub fn with_bandwidth(mut self, octaves: f64) -> Self {
        self.width = FilterWidth::Bandwidth(octaves);
        self
    }
}

/// Biquad coefficients (normalised, `a0 = 1`)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Design coefficients for `spec` at `sample_rate`.
    ///
    /// Rejects frequencies outside `(0, fs/2)`, non-positive widths,
    /// non-finite values, and any result outside the stability triangle.
    pub fn design(spec: &FilterSpec, sample_rate: f64) -> SageResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)
            .map_err(|e| SageError::InvalidFilterConfig(e.to_string()))?;
        let nyquist = sample_rate / 2.0;

        if !spec.frequency.is_finite() || spec.frequency <= 0.0 || spec.frequency >= nyquist {
            return Err(SageError::InvalidFilterConfig(format!(
                "frequency {} Hz outside (0, {}) Hz",
                spec.frequency, nyquist
            )));
        }
        if !spec.gain_db.is_finite() {
            return Err(SageError::InvalidFilterConfig(format!(
                "gain {} dB is not finite",
                spec.gain_db
            )));
        }

        let omega = 2.0 * PI * spec.frequency / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();

        let alpha = match spec.width {
            FilterWidth::Q(q) => {
                if !q.is_finite() || q <= 0.0 {
                    return Err(SageError::InvalidFilterConfig(format!(
                        "Q must be positive, got {q}"
                    )));
                }
                sin_omega / (2.0 * q)
            }
            FilterWidth::Bandwidth(bw) => {
                if !bw.is_finite() || bw <= 0.0 {
                    return Err(SageError::InvalidFilterConfig(format!(
                        "bandwidth must be positive, got {bw} octaves"
                    )));
                }
                sin_omega * (LN_2 / 2.0 * bw * omega / sin_omega).sinh()
            }
        };

        // Cookbook amplitude for peaking and shelving: A = 10^(dB/40)
        let a = 10.0_f64.powf(spec.gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match spec.kind {
            FilterType::Lowpass => (
                (1.0 - cos_omega) / 2.0,
                1.0 - cos_omega,
                (1.0 - cos_omega) / 2.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Highpass => (
                (1.0 + cos_omega) / 2.0,
                -(1.0 + cos_omega),
                (1.0 + cos_omega) / 2.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            // Constant 0 dB peak gain
            FilterType::Bandpass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_omega,
                1.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Allpass => (
                1.0 - alpha,
                -2.0 * cos_omega,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_omega,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_omega,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                    a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                    (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                    a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                    (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
                )
            }
        };

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Normalise raw coefficients by `a0` and check stability
    pub fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> SageResult<Self> {
        if !a0.is_finite() || a0.abs() < f64::EPSILON {
            return Err(SageError::InvalidFilterConfig(format!(
                "degenerate a0 = {a0}"
            )));
        }
        let coeffs = Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
        if !coeffs.is_stable() {
            return Err(SageError::InvalidFilterConfig(format!(
                "unstable poles (a1 = {}, a2 = {})",
                coeffs.a1, coeffs.a2
            )));
        }
        Ok(coeffs)
    }

    /// Bypass (unity gain, no filtering)
    pub fn bypass() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Poles strictly inside the unit circle, all values finite
    #[inline]
    pub fn is_stable(&self) -> bool {
        let finite = [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite());
        finite && self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Linear magnitude response at `freq`
    pub fn magnitude(&self, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let (cos_w, sin_w) = (w.cos(), w.sin());
        let (cos_2w, sin_2w) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * cos_w + self.b2 * cos_2w;
        let num_im = -self.b1 * sin_w - self.b2 * sin_2w;
        let den_re = 1.0 + self.a1 * cos_w + self.a2 * cos_2w;
        let den_im = -self.a1 * sin_w - self.a2 * sin_2w;

        let den = den_re * den_re + den_im * den_im;
        if den <= 0.0 {
            return 0.0;
        }
        ((num_re * num_re + num_im * num_im) / den).sqrt()
    }

    /// Magnitude response at `freq` in dB
    pub fn magnitude_db(&self, freq: f64, sample_rate: f64) -> f64 {
        sage_core::linear_to_db(self.magnitude(freq, sample_rate))
    }
}

/// Transposed Direct Form II biquad filter
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    spec: Option<FilterSpec>,
    z1: f64,
    z2: f64,
    sample_rate: f64,
}

impl Biquad {
    /// Create a bypassed filter
    pub fn new(sample_rate: f64) -> Self {
        Self {
            coeffs: BiquadCoeffs::bypass(),
            spec: None,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        }
    }

    /// Create a filter already configured for `spec`
    pub fn with_spec(spec: FilterSpec, sample_rate: f64) -> SageResult<Self> {
        let mut filter = Self::new(sample_rate);
        filter.configure(spec)?;
        Ok(filter)
    }

    pub fn with_coeffs(coeffs: BiquadCoeffs, sample_rate: f64) -> Self {
        debug_assert!(coeffs.is_stable(), "unstable biquad coefficients");
        Self {
            coeffs,
            spec: None,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        }
    }

    /// Design and install coefficients for `spec`.
    ///
    /// On error the previous coefficients stay in place.
    pub fn configure(&mut self, spec: FilterSpec) -> SageResult<()> {
        match BiquadCoeffs::design(&spec, self.sample_rate) {
            Ok(coeffs) => {
                log::debug!(
                    "biquad configured: {:?} {:.1} Hz {:?} {:+.1} dB @ {} Hz",
                    spec.kind,
                    spec.frequency,
                    spec.width,
                    spec.gain_db,
                    self.sample_rate
                );
                self.coeffs = coeffs;
                self.spec = Some(spec);
                Ok(())
            }
            Err(err) => {
                log::warn!("rejected filter config {spec:?}: {err}");
                Err(err)
            }
        }
    }

    /// Install pre-computed coefficients (state is kept)
    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        debug_assert!(coeffs.is_stable(), "unstable biquad coefficients");
        self.coeffs = coeffs;
        self.spec = None;
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn spec(&self) -> Option<&FilterSpec> {
        self.spec.as_ref()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set as bypass
    pub fn set_bypass(&mut self) {
        self.coeffs = BiquadCoeffs::bypass();
        self.spec = None;
    }

    /// Magnitude response of the installed coefficients in dB
    pub fn magnitude_db(&self, freq: f64) -> f64 {
        self.coeffs.magnitude_db(freq, self.sample_rate)
    }
}

impl Processor for Biquad {
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl MonoProcessor for Biquad {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let output = self.coeffs.b0 * input + self.z1;
        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }
}

impl ProcessorConfig for Biquad {
    fn set_sample_rate(&mut self, sample_rate: f64) -> SageResult<()> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        if let Some(spec) = self.spec {
            let coeffs = BiquadCoeffs::design(&spec, sample_rate)?;
            self.coeffs = coeffs;
        }
        self.sample_rate = sample_rate;
        Ok(())
    }
}
