//! Error types for the pitch detection engine.

use thiserror::Error;

/// Errors returned by the detection pipeline.
///
/// Silence and an indeterminate pitch are regular outcomes and never show up
/// here; see [`crate::Detection`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PitchError {
    /// The sample buffer contains no samples.
    #[error("Invalid input: sample buffer is empty")]
    EmptyBuffer,

    /// The sample rate must be a positive number of Hz.
    #[error("Invalid input: sample rate must be positive, got {0} Hz")]
    InvalidSampleRate(u32),

    /// A sample is NaN or infinite.
    #[error("Invalid input: sample {index} is not a finite number")]
    NonFiniteSample { index: usize },

    /// The harmonic product spectrum needs at least two harmonics.
    #[error("Invalid input: harmonics must be at least 2, got {0}")]
    InvalidHarmonics(usize),

    /// The silence threshold must be a finite, non-negative amplitude.
    #[error("Invalid input: silence threshold must be finite and >= 0, got {0}")]
    InvalidThreshold(f32),

    /// The HPS harmonic floor must lie in [0, 1].
    #[error("Invalid input: HPS floor must be within [0, 1], got {0}")]
    InvalidFloor(f64),

    /// The autocorrelation fallback search start must be a positive lag.
    #[error("Invalid input: autocorrelation fallback lag must be at least 1, got {0}")]
    InvalidFallbackLag(usize),

    /// The requested detection method is not one of fft, autocorr or hps.
    #[error("Unsupported detection method: {0:?} (expected fft, autocorr or hps)")]
    UnsupportedMethod(String),

    /// The numeric pipeline produced something unusable.
    #[error("Numerical error: {0}")]
    Numerical(String),
}

impl PitchError {
    /// True for errors caused by the caller's arguments rather than by the signal.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PitchError::EmptyBuffer
                | PitchError::InvalidSampleRate(_)
                | PitchError::NonFiniteSample { .. }
                | PitchError::InvalidHarmonics(_)
                | PitchError::InvalidThreshold(_)
                | PitchError::InvalidFloor(_)
                | PitchError::InvalidFallbackLag(_)
                | PitchError::UnsupportedMethod(_)
        )
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, PitchError>;
