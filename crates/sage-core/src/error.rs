//! Error types for SoundSage

use thiserror::Error;

/// Core error type
///
/// Only configuration entry points return these. Expected transient
/// measurement conditions (not enough history, everything gated) are
/// sentinel readings, not errors.
#[derive(Error, Debug)]
pub enum SageError {
    #[error("Invalid filter config: {0}")]
    InvalidFilterConfig(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
}

/// Result type alias
pub type SageResult<T> = Result<T, SageError>;
