//! sage-core: Shared types, units, and errors for SoundSage
//!
//! This crate provides the foundational types used by the metering and
//! dynamics crates: the sample type, decibel conversions, BS.1770 channel
//! roles, and the error taxonomy.

mod channel;
mod error;
mod sample;
mod units;

pub use channel::*;
pub use error::*;
pub use sample::*;
pub use units::*;

/// Lowest operating rate accepted by the processors
pub const MIN_SAMPLE_RATE: f64 = 8000.0;

/// Highest operating rate accepted by the processors
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

/// Validate an operating sample rate.
///
/// Processors take `f64` rates so non-standard host rates work; anything
/// non-finite or outside `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE` is rejected.
pub fn validate_sample_rate(sample_rate: f64) -> SageResult<f64> {
    if sample_rate.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        Ok(sample_rate)
    } else {
        Err(SageError::InvalidSampleRate(sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sample_rate() {
        assert!(validate_sample_rate(44100.0).is_ok());
        assert!(validate_sample_rate(0.0).is_err());
        assert!(validate_sample_rate(f64::NAN).is_err());
        assert!(validate_sample_rate(1.0e7).is_err());
    }
}
