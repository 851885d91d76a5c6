use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use pitch_core::{DetectionConfig, Method};

/// Pitch detection from an audio input device.
#[derive(Parser, Debug)]
#[command(name = "pitch", version, about, long_about = None)]
pub struct Cli {
    /// Length of each recording in seconds.
    #[arg(long, default_value_t = 0.5)]
    pub duration: f32,

    /// Requested capture sample rate in Hz.
    #[arg(long, default_value_t = 44_100)]
    pub samplerate: u32,

    /// Estimation method: fft, autocorr, hps. Default: hps.
    #[arg(long)]
    pub method: Option<Method>,

    /// Number of harmonics multiplied by the hps method. Default: 5.
    #[arg(long)]
    pub harmonics: Option<usize>,

    /// Peak amplitude below which a recording counts as silence. Default: 0.01.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Keep recording and detecting until interrupted.
    #[arg(long, default_value_t = false)]
    pub continuous: bool,

    /// Input device index, as printed by --list-devices.
    #[arg(long)]
    pub device: Option<usize>,

    /// Print the available input devices and exit.
    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Write each non-silent recording to this WAV file.
    #[arg(long)]
    pub save_audio: Option<PathBuf>,

    /// JSON detection config. Flags given on the command line take precedence.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print each detection as a JSON line.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Builds the detection config from the optional config file and the
    /// command-line overrides.
    ///
    /// # Errors
    /// Fails on an unreadable or malformed config file, or when the merged
    /// parameters are out of range.
    pub fn resolve_config(&self) -> anyhow::Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => DetectionConfig::default(),
        };

        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(harmonics) = self.harmonics {
            config.harmonics = harmonics;
        }
        if let Some(threshold) = self.threshold {
            config.silence_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the capture parameters that the core does not see.
    pub fn validate_capture(&self) -> anyhow::Result<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            anyhow::bail!(
                "--duration must be a positive number of seconds, got {}",
                self.duration
            );
        }
        if self.samplerate == 0 {
            anyhow::bail!("--samplerate must be greater than zero");
        }
        Ok(())
    }
}

/// Reads a [`DetectionConfig`] from a JSON file. Missing keys keep their
/// defaults.
pub fn load_config(path: &Path) -> anyhow::Result<DetectionConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}
