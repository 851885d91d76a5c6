//! # Audio Capture Module
//!
//! This module records fixed-length buffers from an input device using CPAL
//! (Cross-Platform Audio Library) and hands them to the detection engine.
//!
//! ## Features
//! - Default or indexed input device selection
//! - Closest supported sample rate, 32-bit float format
//! - Multi-channel input down-mixed to mono
//! - Stream callback decoupled from the caller through a channel

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Extra time allowed for the device to deliver a full recording.
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

/// A mono recording and the rate it was captured at.
#[derive(Debug, Clone)]
pub struct Capture {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// An input device as shown by `--list-devices`.
#[derive(Debug, Clone)]
pub struct InputDevice {
    pub index: usize,
    pub name: String,
    pub max_input_channels: u16,
}

/// Lists the input devices of the default host, in the order `--device`
/// indexes them.
pub fn list_input_devices() -> Result<Vec<InputDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();
    for (index, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let max_input_channels = device
            .supported_input_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0);
        devices.push(InputDevice {
            index,
            name,
            max_input_channels,
        });
    }
    Ok(devices)
}

fn select_device(host: &cpal::Host, device_index: Option<usize>) -> Result<cpal::Device> {
    match device_index {
        Some(index) => host
            .input_devices()?
            .nth(index)
            .ok_or_else(|| anyhow!("No input device with index {index} (see --list-devices)")),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available")),
    }
}

/// Records `duration` of audio from the selected input device.
///
/// This function:
/// 1. Selects the device (default, or by index)
/// 2. Picks the f32 configuration closest to `sample_rate`
/// 3. Streams down-mixed chunks from the callback over a channel
/// 4. Returns once enough samples have arrived
///
/// # Errors
/// Fails when no device or f32 format is available, the stream cannot be
/// built, or the device stops delivering audio.
pub fn record(
    device_index: Option<usize>,
    sample_rate: u32,
    duration: Duration,
) -> Result<Capture> {
    let host = cpal::default_host();
    let device = select_device(&host, device_index)?;
    log::info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, sample_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = sample_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = usize::from(config.channels());
    let sample_rate_val = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    if sample_rate_val != sample_rate {
        log::warn!("Requested {sample_rate} Hz, device records at {sample_rate_val} Hz");
    }

    let target = ((duration.as_secs_f64() * f64::from(sample_rate_val)).round() as usize).max(1);
    let (sender, receiver) = crossbeam_channel::unbounded::<Vec<f32>>();
    let err_fn = |err| log::error!("An error occurred on the audio stream: {err}");

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // The receiver is gone once the recording is complete.
            let _ = sender.send(downmix(data, channels));
        },
        err_fn,
        None,
    )?;
    stream.play()?;

    let deadline = Instant::now() + duration + CAPTURE_GRACE;
    let mut samples = Vec::with_capacity(target);
    while samples.len() < target {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let chunk = receiver
            .recv_timeout(remaining)
            .context("Timed out waiting for audio from the input device")?;
        samples.extend_from_slice(&chunk);
    }
    drop(stream);
    samples.truncate(target);

    log::debug!("Captured {} samples at {sample_rate_val} Hz", samples.len());
    Ok(Capture {
        samples,
        sample_rate: sample_rate_val,
    })
}

/// Averages interleaved frames of `channels` samples into one mono sample.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats qualify. Among those, configurations that
/// contain the target rate win, then fewer channels, then the smallest
/// distance to the target rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (distance, c.channels())
        })
}
