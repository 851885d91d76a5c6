//! Peak picking and parabolic interpolation shared by every estimator.

/// Added to magnitudes before taking their logarithm so empty bins stay finite.
pub const LOG_EPSILON: f64 = 1e-10;

/// Domain the three samples around a peak are fitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// `ln(value + LOG_EPSILON)`; a Gaussian-like spectral lobe becomes a
    /// parabola, which removes most of the quantisation bias.
    LogMagnitude,
    /// Values are fitted as-is (correlation curves).
    Linear,
}

impl Domain {
    fn map(self, value: f64) -> f64 {
        match self {
            Domain::LogMagnitude => (value + LOG_EPSILON).ln(),
            Domain::Linear => value,
        }
    }
}

/// Index of the first maximum of `values`, ignoring NaNs.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// Sub-sample offset of the vertex of the parabola through
/// `values[peak - 1..=peak + 1]`, relative to `peak`.
///
/// Returns `None` when `peak` has no neighbour on one side. A flat or
/// degenerate fit yields an offset of zero.
pub fn parabolic_offset(values: &[f64], peak: usize, domain: Domain) -> Option<f64> {
    if peak == 0 || peak + 1 >= values.len() {
        return None;
    }
    let y0 = domain.map(values[peak - 1]);
    let y1 = domain.map(values[peak]);
    let y2 = domain.map(values[peak + 1]);

    let denominator = y0 - 2.0 * y1 + y2;
    let offset = 0.5 * (y0 - y2) / denominator;
    if offset.is_finite() { Some(offset) } else { Some(0.0) }
}

/// Fractional position of the peak at `peak`, falling back to the integer
/// index at the edges of `values`.
pub fn refine_peak(values: &[f64], peak: usize, domain: Domain) -> f64 {
    match parabolic_offset(values, peak, domain) {
        Some(offset) => {
            log::trace!("parabolic refinement at {peak}: offset {offset:+.4}");
            peak as f64 + offset
        }
        None => peak as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_returns_first_maximum() {
        assert_eq!(argmax(&[1.0, 3.0, 2.0, 3.0]), Some(1));
        assert_eq!(argmax(&[f64::NAN, 0.5, f64::NAN]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn linear_fit_recovers_parabola_vertex() {
        // y = -(x - 2.3)^2 sampled at x = 1, 2, 3
        let values: Vec<f64> = (0..5).map(|x| -((x as f64) - 2.3).powi(2)).collect();
        let refined = refine_peak(&values, 2, Domain::Linear);
        assert!((refined - 2.3).abs() < 1e-12);
    }

    #[test]
    fn log_fit_recovers_gaussian_centre() {
        // exp(-(x - 10.4)^2 / 8) is a parabola in the log domain
        let values: Vec<f64> = (0..20)
            .map(|x| 1000.0 * (-((x as f64) - 10.4).powi(2) / 8.0).exp())
            .collect();
        let peak = argmax(&values).unwrap();
        assert_eq!(peak, 10);
        let refined = refine_peak(&values, peak, Domain::LogMagnitude);
        assert!((refined - 10.4).abs() < 1e-6, "got {refined}");
    }

    #[test]
    fn edges_are_not_interpolated() {
        let values = [5.0, 3.0, 1.0];
        assert_eq!(parabolic_offset(&values, 0, Domain::Linear), None);
        assert_eq!(parabolic_offset(&values, 2, Domain::Linear), None);
        assert_eq!(refine_peak(&values, 0, Domain::LogMagnitude), 0.0);
    }

    #[test]
    fn flat_neighbourhood_gives_zero_offset() {
        let values = [2.0, 2.0, 2.0];
        assert_eq!(parabolic_offset(&values, 1, Domain::Linear), Some(0.0));
    }
}
