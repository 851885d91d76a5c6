//! Saving captured audio as WAV

use std::path::Path;

use anyhow::{Context, Result};

/// Writes mono samples as a 32-bit float WAV file, replacing any existing file.
pub fn save_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finish {}", path.display()))?;
    log::info!("Wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_audio_reads_back_unchanged() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("take.wav");
        let samples: Vec<f32> = (0..441).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();

        save_wav(&path, &samples, 44_100).expect("save");

        let mut reader = hound::WavReader::open(&path).expect("open");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let read: Vec<f32> = reader.samples::<f32>().map(|s| s.expect("sample")).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn missing_directories_are_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing").join("take.wav");
        assert!(save_wav(&path, &[0.0], 8_000).is_err());
    }
}
