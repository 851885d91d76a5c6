//! # Detection Module
//!
//! Ties the pipeline together: input validation, the silence gate, the
//! selected estimator and the note mapper. Every call is a pure function of
//! its arguments.

use crate::config::DetectionConfig;
use crate::error::{PitchError, Result};
use crate::pitch::{Estimator, FrequencyEstimator, Method, validate_signal};
use crate::tuning;
use crate::Detection;

/// Largest absolute sample value, 0 for an empty buffer.
pub fn peak_amplitude(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0_f32, |peak, &s| peak.max(s.abs()))
}

/// Detects the pitch of `signal` with explicit parameters.
///
/// `harmonics` is only read, and only checked, for [`Method::Hps`].
///
/// # Errors
/// Invalid input (empty buffer, zero sample rate, bad parameters) fails
/// before any numeric work; numeric failures of the estimator are passed on.
pub fn detect(
    signal: &[f32],
    sample_rate: u32,
    method: Method,
    harmonics: usize,
    silence_threshold: f32,
) -> Result<Detection> {
    let config = DetectionConfig {
        harmonics,
        silence_threshold,
        ..DetectionConfig::with_method(method)
    };
    detect_with(signal, sample_rate, &config)
}

/// Detects the pitch of `signal` using every parameter of `config`.
pub fn detect_with(
    signal: &[f32],
    sample_rate: u32,
    config: &DetectionConfig,
) -> Result<Detection> {
    validate_signal(signal, sample_rate)?;
    config.validate()?;
    let estimator = Estimator::from_config(config)?;
    detect_using(&estimator, signal, sample_rate, config.silence_threshold)
}

/// Detects the pitch of `signal` with any [`FrequencyEstimator`].
///
/// Buffers whose peak amplitude is below `silence_threshold` return
/// [`Detection::Silence`] without running the estimator.
pub fn detect_using(
    estimator: &dyn FrequencyEstimator,
    signal: &[f32],
    sample_rate: u32,
    silence_threshold: f32,
) -> Result<Detection> {
    validate_signal(signal, sample_rate)?;
    if !(silence_threshold.is_finite() && silence_threshold >= 0.0) {
        return Err(PitchError::InvalidThreshold(silence_threshold));
    }

    let amplitude = peak_amplitude(signal);
    if amplitude < silence_threshold {
        log::debug!("silence: peak amplitude {amplitude:.5} < threshold {silence_threshold}");
        return Ok(Detection::Silence);
    }

    let frequency_hz = estimator.estimate(signal, sample_rate)?;
    let note = tuning::map_frequency(frequency_hz);
    log::debug!(
        "{}: {frequency_hz:.2} Hz from {} samples at {sample_rate} Hz",
        estimator.method(),
        signal.len()
    );

    Ok(Detection::Pitched { frequency_hz, note })
}
