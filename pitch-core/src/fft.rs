//! # Fast Fourier Transform (FFT) Module
//!
//! Spectral building blocks shared by the estimators: window functions,
//! DC removal, the zero-padding rule, magnitude spectra and FFT-based
//! autocorrelation.
//!
//! ## Features
//! - Hann and Blackman windows (numpy conventions, symmetric)
//! - Zero-padding to a power of two for sub-bin spectral resolution
//! - Real-input magnitude spectrum using RustFFT
//! - Linear (non-circular) autocorrelation in O(n log n)

use rustfft::{FftPlanner, num_complex::Complex};

/// Zero-padding factor applied before spectral analysis.
pub const PADDING_FACTOR: usize = 4;

/// Window functions used to taper a buffer before transforming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// `0.5 - 0.5 cos(2πn/(M-1))`
    Hann,
    /// `0.42 - 0.5 cos(2πn/(M-1)) + 0.08 cos(4πn/(M-1))`
    Blackman,
}

impl Window {
    /// Multiplies `buffer` in place by this window.
    ///
    /// A single-sample window is `[1.0]`, which keeps one-sample buffers
    /// from being divided by `M - 1 = 0`.
    pub fn apply(self, buffer: &mut [f64]) {
        let n = buffer.len();
        if n < 2 {
            return;
        }
        let n_minus_1 = (n - 1) as f64;
        for (i, sample) in buffer.iter_mut().enumerate() {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n_minus_1;
            let multiplier = match self {
                Window::Hann => 0.5 - 0.5 * phase.cos(),
                Window::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
            };
            *sample *= multiplier;
        }
    }
}

/// Copies the samples into a working `f64` buffer and applies `window`.
pub fn windowed(samples: &[f32], window: Window) -> Vec<f64> {
    let mut buffer: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    window.apply(&mut buffer);
    buffer
}

/// Removes the DC offset from a signal by making its average value zero.
///
/// A constant component correlates perfectly with itself at every lag,
/// so it has to go before autocorrelation.
pub fn remove_dc_offset(signal: &mut [f64]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f64>() / len as f64;
    for sample in signal.iter_mut() {
        *sample -= avg;
    }
}

/// Length a buffer of `len` samples is zero-padded to: the next power of
/// two that is at least [`PADDING_FACTOR`] times longer.
pub fn padded_length(len: usize) -> usize {
    (len * PADDING_FACTOR).next_power_of_two()
}

/// Magnitude spectrum of a real signal, bins `0..=padded_len / 2`.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// `|X[k]|` for each non-negative frequency bin.
    pub magnitudes: Vec<f64>,
    /// Distance between bins in Hz (`sample_rate / padded_len`).
    pub bin_width: f64,
}

impl Spectrum {
    /// Converts a (possibly fractional) bin index to Hz.
    pub fn bin_to_frequency(&self, bin: f64) -> f64 {
        bin * self.bin_width
    }

    /// Largest magnitude in the spectrum, 0 for an empty one.
    pub fn max_magnitude(&self) -> f64 {
        self.magnitudes.iter().copied().fold(0.0, f64::max)
    }
}

/// Computes the magnitude spectrum of `signal` zero-padded to `padded_len`.
///
/// `padded_len` must be at least `signal.len()`; samples past it are ignored.
pub fn magnitude_spectrum(signal: &[f64], padded_len: usize, sample_rate: u32) -> Spectrum {
    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .take(padded_len)
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .collect();
    buffer.resize(padded_len, Complex { re: 0.0, im: 0.0 });

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded_len);
    fft.process(&mut buffer);

    // Only the first half plus Nyquist carries information for real input.
    let magnitudes = buffer
        .iter()
        .take(padded_len / 2 + 1)
        .map(|c| c.norm())
        .collect();

    Spectrum {
        magnitudes,
        bin_width: f64::from(sample_rate) / padded_len as f64,
    }
}

/// Linear autocorrelation of `signal` for lags `0..signal.len()`.
///
/// The signal is padded to at least twice its length so the circular
/// correlation computed by the FFT equals the linear one.
pub fn autocorrelation(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .collect();
    buffer.resize(size, Complex { re: 0.0, im: 0.0 });

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(size).process(&mut buffer);
    for bin in buffer.iter_mut() {
        *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
    }
    planner.plan_fft_inverse(size).process(&mut buffer);

    // RustFFT does not normalise the inverse transform.
    buffer
        .iter()
        .take(n)
        .map(|c| c.re / size as f64)
        .collect()
}
