//! sage-dsp: Metering and dynamics DSP for SoundSage
//!
//! Allocation-free, lock-free processors meant to run inside the host's
//! real-time audio callback.
//!
//! ## Modules
//! - `biquad` - TDF-II biquad filters designed from the EQ cookbook
//! - `k_weighting` - ITU-R BS.1770 K-weighting pre-filter
//! - `loudness` - Momentary / short-term / integrated loudness
//! - `gating` - Two-stage gating, integration and loudness range
//! - `true_peak` - 4x oversampled inter-sample peak detection
//! - `dynamics` - Envelope follower, gain computer, compressor, limiter, gate
//! - `presets` - Enumerated effect presets and delivery loudness targets
//! - `bridge` - Real-time to reporting-thread meter handoff
//!
//! ## Threading contract
//! Processing methods take `&mut self` and never block, lock, or allocate.
//! `reset()` must only be called between sessions (e.g. on transport stop),
//! never concurrently with an in-flight block.

pub mod biquad;
pub mod bridge;
pub mod dynamics;
pub mod gating;
pub mod k_weighting;
pub mod loudness;
pub mod presets;
pub mod true_peak;

pub use bridge::{LoudnessSnapshot, MeterPublisher, MeterReader, ParamQueue, meter_bridge};
pub use loudness::{LoudnessAccumulator, LoudnessMeter, LoudnessMeterConfig, LoudnessReading};

use sage_core::{Sample, SageResult};

/// Trait for all DSP processors
///
/// `Send` so a processor can be built on a control thread and moved into
/// the audio callback.
pub trait Processor: Send {
    /// Reset processor state (between sessions only)
    fn reset(&mut self);

    /// Get latency in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Processor configuration for sample rate changes
///
/// Re-derives coefficients for the new rate. Not real-time safe.
pub trait ProcessorConfig {
    fn set_sample_rate(&mut self, sample_rate: f64) -> SageResult<()>;
}
