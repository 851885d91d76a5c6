// pitch-core/src/lib.rs

//! The core logic for the pitch detector.
//! This crate estimates the fundamental frequency of a mono audio buffer
//! with one of three algorithms (FFT peak, autocorrelation, harmonic
//! product spectrum) and names the nearest equal-tempered note. It is
//! completely headless and performs no I/O.
//!
//! ```
//! use pitch_core::{detect, Detection, Method};
//!
//! let sample_rate = 44_100;
//! let tone: Vec<f32> = (0..8192)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
//!     .collect();
//!
//! let detection = detect(&tone, sample_rate, Method::Fft, 5, 0.01)?;
//! assert_eq!(detection.note().map(|n| n.to_string()), Some("A4".to_string()));
//! # Ok::<(), pitch_core::PitchError>(())
//! ```

pub mod config;
pub mod detection;
pub mod error;
pub mod fft;
pub mod peak;
pub mod pitch;
pub mod tuning;

use serde::Serialize;

pub use config::DetectionConfig;
pub use detection::{detect, detect_using, detect_with, peak_amplitude};
pub use error::PitchError;
pub use pitch::{
    AutocorrelationEstimator, Estimator, FftEstimator, FrequencyEstimator, HpsEstimator, Method,
};
pub use tuning::{NoteMapping, NoteReading};

/// Represents the result of a single detection call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    /// The buffer's peak amplitude was below the silence threshold.
    Silence,
    /// An estimator ran on the buffer.
    Pitched {
        /// The estimated fundamental frequency in Hz (finite, >= 0).
        frequency_hz: f32,
        /// The nearest note, or `NotApplicable` below 20 Hz.
        note: NoteMapping,
    },
}

impl Detection {
    /// The estimated frequency, if an estimator ran.
    pub fn frequency(&self) -> Option<f32> {
        match self {
            Detection::Silence => None,
            Detection::Pitched { frequency_hz, .. } => Some(*frequency_hz),
        }
    }

    /// The nearest note, if the frequency was in the musical range.
    pub fn note(&self) -> Option<&NoteReading> {
        match self {
            Detection::Silence => None,
            Detection::Pitched { note, .. } => note.reading(),
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, Detection::Silence)
    }

    /// True when the autocorrelation estimator found no period (0 Hz).
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Detection::Pitched { frequency_hz, .. } if *frequency_hz == 0.0)
    }
}
