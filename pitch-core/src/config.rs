//! Configuration parameters for pitch detection

use serde::{Deserialize, Serialize};

use crate::error::{PitchError, Result};
use crate::pitch::{DEFAULT_FALLBACK_LAG, DEFAULT_HARMONICS, DEFAULT_HPS_FLOOR, Method};

/// Default peak amplitude below which a buffer counts as silence.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;

/// Detection configuration parameters
///
/// Every field has a default, so a JSON file only needs to list the values
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Estimator to run (default: hps)
    pub method: Method,

    /// Harmonics multiplied by the HPS estimator, at least 2 (default: 5)
    pub harmonics: usize,

    /// Peak absolute amplitude below which the buffer is silence (default: 0.01)
    pub silence_threshold: f32,

    /// Autocorrelation search start when the curve has no valley (default: 5)
    ///
    /// Uncalibrated; worth revisiting against real recordings.
    pub autocorr_fallback_lag: usize,

    /// HPS floor for decimated factors, relative to the strongest bin (default: 0.01)
    /// 0 disables flooring.
    pub hps_floor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            harmonics: DEFAULT_HARMONICS,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            autocorr_fallback_lag: DEFAULT_FALLBACK_LAG,
            hps_floor: DEFAULT_HPS_FLOOR,
        }
    }
}

impl DetectionConfig {
    /// Default configuration running `method`.
    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Checks the silence threshold and the parameters of the selected
    /// method. Fields only another method reads are not checked.
    pub fn validate(&self) -> Result<()> {
        if !(self.silence_threshold.is_finite() && self.silence_threshold >= 0.0) {
            return Err(PitchError::InvalidThreshold(self.silence_threshold));
        }
        match self.method {
            Method::Fft => {}
            Method::Autocorrelation => {
                if self.autocorr_fallback_lag == 0 {
                    return Err(PitchError::InvalidFallbackLag(self.autocorr_fallback_lag));
                }
            }
            Method::Hps => {
                if self.harmonics < 2 {
                    return Err(PitchError::InvalidHarmonics(self.harmonics));
                }
                if !(0.0..=1.0).contains(&self.hps_floor) {
                    return Err(PitchError::InvalidFloor(self.hps_floor));
                }
            }
        }
        Ok(())
    }
}
