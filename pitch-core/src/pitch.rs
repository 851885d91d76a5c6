//! # Pitch Detection Module
//!
//! This module implements the three interchangeable fundamental-frequency
//! estimators used by the engine. Each one consumes a mono buffer plus its
//! sample rate and returns a frequency in Hz.
//!
//! ## Features
//! - FFT peak picking with a Blackman window and log-parabolic refinement
//! - Autocorrelation with a valley-gated period search
//! - Harmonic product spectrum for tones with a weak fundamental
//! - A single [`FrequencyEstimator`] interface so callers can dispatch uniformly

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::{PitchError, Result};
use crate::fft::{self, Window};
use crate::peak::{self, Domain};

/// Default number of harmonics multiplied by the HPS estimator.
pub const DEFAULT_HARMONICS: usize = 5;

/// Lag the autocorrelation search starts at when the curve has no valley.
pub const DEFAULT_FALLBACK_LAG: usize = 5;

/// Default HPS floor, relative to the strongest spectral bin.
pub const DEFAULT_HPS_FLOOR: f64 = 0.01;

/// Level, relative to the strongest bin, a spectral peak needs to be reported
/// by the HPS estimator. Sits above the first Hann sidelobe (-31 dB).
pub const HPS_PEAK_LEVEL: f64 = 0.05;

/// Fraction of the period peak's correlation a shorter lag needs to replace it.
pub const SUBMULTIPLE_RATIO: f64 = 0.9;

/// Common interface of every frequency estimator.
pub trait FrequencyEstimator: Send + Sync {
    /// Estimates the fundamental frequency of `signal` in Hz.
    ///
    /// # Errors
    /// * invalid input (empty buffer, zero sample rate, non-finite samples)
    /// * [`PitchError::Numerical`] when the numeric pipeline degenerates
    fn estimate(&self, signal: &[f32], sample_rate: u32) -> Result<f32>;

    /// The method this estimator implements.
    fn method(&self) -> Method;
}

/// Rejects buffers that no estimator can work with.
pub fn validate_signal(signal: &[f32], sample_rate: u32) -> Result<()> {
    if signal.is_empty() {
        return Err(PitchError::EmptyBuffer);
    }
    if sample_rate == 0 {
        return Err(PitchError::InvalidSampleRate(sample_rate));
    }
    if let Some(index) = signal.iter().position(|s| !s.is_finite()) {
        return Err(PitchError::NonFiniteSample { index });
    }
    Ok(())
}

/// Narrows an internal estimate to the public `f32`, refusing garbage.
fn finite_hz(frequency: f64, method: Method) -> Result<f32> {
    let hz = frequency as f32;
    if hz.is_finite() && hz >= 0.0 {
        Ok(hz)
    } else {
        Err(PitchError::Numerical(format!(
            "{method} estimator produced an unusable frequency ({frequency} Hz)"
        )))
    }
}

/// Spectral peak estimator.
///
/// Blackman window, zero-padding to [`fft::padded_length`], then the
/// strongest bin refined with a parabola fitted to the log magnitudes.
/// Peaks on the first or last bin are reported unrefined.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FftEstimator;

impl FrequencyEstimator for FftEstimator {
    fn estimate(&self, signal: &[f32], sample_rate: u32) -> Result<f32> {
        validate_signal(signal, sample_rate)?;

        let windowed = fft::windowed(signal, Window::Blackman);
        let spectrum =
            fft::magnitude_spectrum(&windowed, fft::padded_length(signal.len()), sample_rate);

        let peak_bin = peak::argmax(&spectrum.magnitudes)
            .ok_or_else(|| PitchError::Numerical("magnitude spectrum is empty".into()))?;
        let bin = peak::refine_peak(&spectrum.magnitudes, peak_bin, Domain::LogMagnitude);
        log::debug!(
            "fft: peak bin {peak_bin} refined to {bin:.3} (bin width {:.4} Hz)",
            spectrum.bin_width
        );

        finite_hz(spectrum.bin_to_frequency(bin), Method::Fft)
    }

    fn method(&self) -> Method {
        Method::Fft
    }
}

/// Time-domain estimator based on the normalised autocorrelation.
///
/// The search for the period peak starts at the first valley after lag 0,
/// which skips the lobe around the trivial zero-lag maximum. Buffers whose
/// correlation has no valley start at `fallback_lag` instead. When the
/// strongest lag is a multiple of the period, the period itself is reported
/// (see [`shortest_period`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocorrelationEstimator {
    fallback_lag: usize,
}

impl Default for AutocorrelationEstimator {
    fn default() -> Self {
        Self {
            fallback_lag: DEFAULT_FALLBACK_LAG,
        }
    }
}

impl AutocorrelationEstimator {
    /// Creates an estimator with a custom fallback search start.
    pub fn new(fallback_lag: usize) -> Result<Self> {
        if fallback_lag == 0 {
            return Err(PitchError::InvalidFallbackLag(fallback_lag));
        }
        Ok(Self { fallback_lag })
    }

    pub fn fallback_lag(&self) -> usize {
        self.fallback_lag
    }
}

/// Index of the first local minimum of `values`, excluding both ends.
///
/// A flat-bottomed valley counts once, at the middle of its plateau.
pub fn first_valley(values: &[f64]) -> Option<usize> {
    let len = values.len();
    let mut i = 1;
    while i + 1 < len {
        if values[i - 1] > values[i] {
            let mut right = i;
            while right + 1 < len && values[right + 1] == values[i] {
                right += 1;
            }
            if right + 1 < len && values[right + 1] > values[i] {
                return Some((i + right) / 2);
            }
            i = right + 1;
        } else {
            i += 1;
        }
    }
    None
}

/// Refined lag of the period peak in a normalised autocorrelation.
///
/// Returns `None` when no peak lies strictly past the search start, which
/// the estimator reports as 0 Hz.
pub fn period_lag(correlation: &[f64], fallback_lag: usize) -> Option<f64> {
    let start = first_valley(correlation).unwrap_or(fallback_lag);
    if start >= correlation.len() {
        log::debug!("autocorr: search start {start} is past the last lag");
        return None;
    }

    let peak_lag = start + peak::argmax(&correlation[start..])?;
    if peak_lag <= start {
        log::debug!("autocorr: no peak past search start {start}");
        return None;
    }

    let period = shortest_period(correlation, start, peak_lag);
    let lag = peak::refine_peak(correlation, period, Domain::Linear);
    log::debug!(
        "autocorr: search start {start}, peak lag {peak_lag}, period {period} refined to {lag:.3}"
    );
    Some(lag)
}

/// Smallest lag near `peak / d` (d = 2, 3, ...) that is a local maximum
/// reaching [`SUBMULTIPLE_RATIO`] of the correlation at `peak`, or `peak`.
///
/// With a non-integer period the sampled correlation can peak higher at a
/// multiple of the period than at the period itself.
pub fn shortest_period(correlation: &[f64], start: usize, peak: usize) -> usize {
    let Some(&peak_value) = correlation.get(peak) else {
        return peak;
    };
    if peak_value <= 0.0 || correlation.len() < 3 {
        return peak;
    }
    let threshold = SUBMULTIPLE_RATIO * peak_value;
    let last = correlation.len() - 2;

    let mut period = peak;
    for divisor in 2..=peak {
        let centre = peak as f64 / divisor as f64;
        if centre <= start as f64 {
            break;
        }
        let lo = (centre.floor() as usize).saturating_sub(1).max(start + 1);
        let hi = (centre.ceil() as usize + 1).min(last);
        if lo > hi {
            continue;
        }
        let Some(offset) = peak::argmax(&correlation[lo..=hi]) else {
            continue;
        };
        let lag = lo + offset;
        let value = correlation[lag];
        if value >= threshold && value >= correlation[lag - 1] && value >= correlation[lag + 1] {
            period = period.min(lag);
        }
    }
    period
}

impl FrequencyEstimator for AutocorrelationEstimator {
    fn estimate(&self, signal: &[f32], sample_rate: u32) -> Result<f32> {
        validate_signal(signal, sample_rate)?;

        let mut windowed = fft::windowed(signal, Window::Hann);
        fft::remove_dc_offset(&mut windowed);
        let mut correlation = fft::autocorrelation(&windowed);

        let energy = correlation[0];
        if !(energy.is_finite() && energy > 0.0) {
            return Err(PitchError::Numerical(format!(
                "autocorrelation has no energy at lag 0 ({energy})"
            )));
        }
        for value in correlation.iter_mut() {
            *value /= energy;
        }

        let Some(lag) = period_lag(&correlation, self.fallback_lag) else {
            return Ok(0.0);
        };
        finite_hz(f64::from(sample_rate) / lag, Method::Autocorrelation)
    }

    fn method(&self) -> Method {
        Method::Autocorrelation
    }
}

/// Harmonic product spectrum estimator.
///
/// The magnitude spectrum is multiplied by copies of itself decimated by
/// 2..=`harmonics`, so only a bin whose whole harmonic stack carries energy
/// stands out. Decimated factors are floored at `floor` times the strongest
/// bin, so an empty harmonic slot cannot veto a real fundamental.
///
/// Only spectral peaks reaching [`HPS_PEAK_LEVEL`] of the strongest bin
/// compete. Leakage skirts and sidelobes of a short tone never win, so the
/// estimate cannot fall on an empty subharmonic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HpsEstimator {
    harmonics: usize,
    floor: f64,
}

impl Default for HpsEstimator {
    fn default() -> Self {
        Self {
            harmonics: DEFAULT_HARMONICS,
            floor: DEFAULT_HPS_FLOOR,
        }
    }
}

impl HpsEstimator {
    /// Creates an estimator multiplying `harmonics` spectra (at least 2)
    /// with a relative floor in `[0, 1]`.
    pub fn new(harmonics: usize, floor: f64) -> Result<Self> {
        if harmonics < 2 {
            return Err(PitchError::InvalidHarmonics(harmonics));
        }
        if !(0.0..=1.0).contains(&floor) {
            return Err(PitchError::InvalidFloor(floor));
        }
        Ok(Self { harmonics, floor })
    }

    pub fn harmonics(&self) -> usize {
        self.harmonics
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }
}

/// Multiplies `magnitudes` by its decimations `magnitudes[::h]` for
/// `h = 2..=harmonics`.
///
/// Each decimated copy is shorter than the spectrum, so only the prefix it
/// overlaps is multiplied. Factors are clamped to at least `floor`.
/// Harmonics past the spectrum length only touch bin 0 and are skipped.
pub fn harmonic_product(magnitudes: &[f64], harmonics: usize, floor: f64) -> Vec<f64> {
    let mut product = magnitudes.to_vec();
    for h in 2..=harmonics.min(magnitudes.len()) {
        for (acc, &magnitude) in product.iter_mut().zip(magnitudes.iter().step_by(h)) {
            *acc *= magnitude.max(floor);
        }
    }
    product
}

/// Interior local maximum of `magnitudes` below `limit` with the largest
/// harmonic product, among those reaching `level`.
pub fn strongest_partial(
    magnitudes: &[f64],
    product: &[f64],
    limit: usize,
    level: f64,
) -> Option<usize> {
    let end = limit.min(magnitudes.len().saturating_sub(1));
    (1..end)
        .filter(|&i| {
            magnitudes[i] >= level
                && magnitudes[i] > magnitudes[i - 1]
                && magnitudes[i] >= magnitudes[i + 1]
        })
        .fold(None, |best, i| match best {
            Some(b) if product[b] >= product[i] => Some(b),
            _ => Some(i),
        })
}

impl FrequencyEstimator for HpsEstimator {
    fn estimate(&self, signal: &[f32], sample_rate: u32) -> Result<f32> {
        validate_signal(signal, sample_rate)?;

        let windowed = fft::windowed(signal, Window::Hann);
        let spectrum =
            fft::magnitude_spectrum(&windowed, fft::padded_length(signal.len()), sample_rate);
        let strongest = spectrum.max_magnitude();
        let product =
            harmonic_product(&spectrum.magnitudes, self.harmonics, self.floor * strongest);

        // Bins past this point were not multiplied by every harmonic.
        let searchable = spectrum.magnitudes.len().div_ceil(self.harmonics);
        let partial = strongest_partial(
            &spectrum.magnitudes,
            &product,
            searchable,
            HPS_PEAK_LEVEL * strongest,
        );
        let bin = match partial {
            Some(peak_bin) => {
                let bin = peak::refine_peak(&spectrum.magnitudes, peak_bin, Domain::LogMagnitude);
                log::debug!(
                    "hps: {} harmonics, partial {peak_bin} of {searchable} refined to {bin:.3}",
                    self.harmonics
                );
                bin
            }
            // No qualifying peak (silent or DC-only spectrum).
            None => {
                let peak_bin = peak::argmax(&product[..searchable]).ok_or_else(|| {
                    PitchError::Numerical("harmonic product spectrum is empty".into())
                })?;
                peak::refine_peak(&product, peak_bin, Domain::LogMagnitude)
            }
        };

        finite_hz(spectrum.bin_to_frequency(bin), Method::Hps)
    }

    fn method(&self) -> Method {
        Method::Hps
    }
}

/// Selects which estimator the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Spectral peak ([`FftEstimator`]).
    Fft,
    /// Autocorrelation ([`AutocorrelationEstimator`]).
    #[serde(rename = "autocorr", alias = "autocorrelation")]
    Autocorrelation,
    /// Harmonic product spectrum ([`HpsEstimator`]).
    #[default]
    Hps,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Fft, Method::Autocorrelation, Method::Hps];

    /// Short name accepted by [`Method::from_str`].
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Fft => "fft",
            Method::Autocorrelation => "autocorr",
            Method::Hps => "hps",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fft" => Ok(Method::Fft),
            "autocorr" | "autocorrelation" => Ok(Method::Autocorrelation),
            "hps" => Ok(Method::Hps),
            _ => Err(PitchError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// One of the three estimators, chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimator {
    Fft(FftEstimator),
    Autocorrelation(AutocorrelationEstimator),
    Hps(HpsEstimator),
}

impl Estimator {
    /// Builds the estimator selected by `config`, validating its parameters.
    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        Ok(match config.method {
            Method::Fft => Estimator::Fft(FftEstimator),
            Method::Autocorrelation => Estimator::Autocorrelation(AutocorrelationEstimator::new(
                config.autocorr_fallback_lag,
            )?),
            Method::Hps => Estimator::Hps(HpsEstimator::new(config.harmonics, config.hps_floor)?),
        })
    }
}

impl FrequencyEstimator for Estimator {
    fn estimate(&self, signal: &[f32], sample_rate: u32) -> Result<f32> {
        match self {
            Estimator::Fft(estimator) => estimator.estimate(signal, sample_rate),
            Estimator::Autocorrelation(estimator) => estimator.estimate(signal, sample_rate),
            Estimator::Hps(estimator) => estimator.estimate(signal, sample_rate),
        }
    }

    fn method(&self) -> Method {
        match self {
            Estimator::Fft(estimator) => estimator.method(),
            Estimator::Autocorrelation(estimator) => estimator.method(),
            Estimator::Hps(estimator) => estimator.method(),
        }
    }
}
