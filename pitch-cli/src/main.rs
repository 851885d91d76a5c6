//! # pitch - Command-line Pitch Detector
//!
//! Records short buffers from an input device, runs the selected estimator
//! from `pitch-core` on each one and prints the nearest note.
//!
//! ## Flow
//! - **Capture**: cpal stream on its own thread, samples delivered over a channel
//! - **Detection**: one `pitch_core::detect_with` call per recording
//! - **Output**: a text line or a JSON object per recording

mod audio;
mod cli;
mod recording;
mod report;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pitch_core::DetectionConfig;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    if cli.list_devices {
        println!("Available devices:");
        for device in audio::list_input_devices()? {
            println!(
                "{}: {} (inputs: {})",
                device.index, device.name, device.max_input_channels
            );
        }
        return Ok(());
    }

    cli.validate_capture()?;
    let config = cli.resolve_config()?;
    log::info!("Detection config: {config:?}");

    if cli.continuous {
        println!("Continuous mode. Ctrl+C to stop.");
        loop {
            // A failed take is reported and the next one starts.
            if let Err(err) = run_once(&cli, &config) {
                eprintln!("Error during detection: {err:#}");
            }
        }
    }

    run_once(&cli, &config)
}

/// Records one buffer, detects its pitch and prints the result.
fn run_once(cli: &Cli, config: &DetectionConfig) -> Result<()> {
    if !cli.json {
        println!("Listening...");
    }
    let capture = audio::record(
        cli.device,
        cli.samplerate,
        Duration::from_secs_f32(cli.duration),
    )?;

    let detection = pitch_core::detect_with(&capture.samples, capture.sample_rate, config)?;

    if let Some(path) = &cli.save_audio {
        if !detection.is_silence() {
            recording::save_wav(path, &capture.samples, capture.sample_rate)?;
            if !cli.json {
                println!("Audio saved to {}", path.display());
            }
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string(&detection)?);
    } else {
        println!("{}", report::format_detection(&detection));
    }
    Ok(())
}
