//! sage-meter: offline front end for the SoundSage metering core
//!
//! Reads WAV files, measures them with `sage_dsp::LoudnessMeter`, checks
//! the result against delivery targets, and renders files through an
//! EQ + dynamics chain.

pub mod analysis;
pub mod chain;
pub mod wav;

pub use analysis::{AnalysisReport, analyze};
pub use chain::{ProcessConfig, ProcessSummary, ProcessingChain, render};
pub use wav::{AudioFile, read_wav, write_wav};

/// Default frames per block for offline runs
pub const DEFAULT_BLOCK_SIZE: usize = 1024;
